use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Console roles. All four are billable; only Manager and Finance may
/// mutate the ledger or manage shared links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Manager,
    Developer,
    Leadership,
    Finance,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Developer => "developer",
            Role::Leadership => "leadership",
            Role::Finance => "finance",
        }
    }

    /// Roles allowed to mark payments and manage shared links.
    pub fn can_administer_payments(&self) -> bool {
        matches!(self, Role::Manager | Role::Finance)
    }
}

/// Directory entry as the reconciliation read path consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub name: String,
    pub hourly_rate: Decimal,
    pub bank_details: Option<String>,
}

/// Resolved session identity supplied by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

/// Hourly rates captured at reconciliation time.
///
/// Passed explicitly into the engine and the mutator so that the rate a
/// computation used is the rate of its own batch fetch. Persisted rows
/// never consult this again; historical amounts are locked in.
#[derive(Debug, Clone, Default)]
pub struct RateSnapshot {
    rates: HashMap<Uuid, Decimal>,
}

impl RateSnapshot {
    pub fn capture(users: &[DirectoryUser]) -> AppResult<Self> {
        let mut rates = HashMap::with_capacity(users.len());
        for user in users {
            if user.hourly_rate < Decimal::ZERO {
                return Err(AppError::Validation(format!(
                    "Negative hourly rate for user {}",
                    user.id
                )));
            }
            rates.insert(user.id, user.hourly_rate);
        }
        Ok(Self { rates })
    }

    pub fn rate_for(&self, user_id: Uuid) -> Option<Decimal> {
        self.rates.get(&user_id).copied()
    }
}
