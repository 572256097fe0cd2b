use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::directory::SessionIdentity;
use crate::error::{AppError, AppResult};
use crate::period::PaySubPeriod;

/// Actor recorded on mutations performed through a shared link. Links are
/// anonymous bearer credentials; a real identity is never attached.
pub const SHARED_LINK_ACTOR: &str = "shared-link";

/// A revocable capability token bound to exactly one pay period.
/// The scope is immutable once minted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SharedLink {
    pub token: String,
    pub month: i32,
    pub year: i32,
    pub period: PaySubPeriod,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SharedLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Outcome of a public link validation. This struct is the API response
/// for the unauthenticated validation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SharedLinkValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<PaySubPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SharedLinkValidation {
    pub fn ok(link: &SharedLink) -> Self {
        Self {
            valid: true,
            month: Some(link.month),
            year: Some(link.year),
            period: Some(link.period),
            error: None,
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: false,
            month: None,
            year: None,
            period: None,
            error: Some("Invalid or expired link".to_string()),
        }
    }
}

/// What a caller presented. There is no third path: absence of both a
/// session and a token is an immediate Unauthorized.
#[derive(Debug, Clone)]
pub enum Credentials {
    Session(SessionIdentity),
    SharedToken(String),
    Anonymous,
}

/// Resolved authorization context. Downstream code pattern-matches on the
/// variant instead of re-checking how the caller authenticated.
#[derive(Debug, Clone)]
pub enum Scope {
    Role { identity: SessionIdentity },
    Link { month: i32, year: i32, period: PaySubPeriod },
}

impl Scope {
    /// Exact-equality check between a link scope and the period a request
    /// targets. Possession of a token is not trusted by itself: a token
    /// bound elsewhere must not operate here even if the caller supplies
    /// plausible-looking coordinates.
    pub fn ensure_period(&self, month: i32, year: i32, period: PaySubPeriod) -> AppResult<()> {
        match self {
            Scope::Role { .. } => Ok(()),
            Scope::Link {
                month: bound_month,
                year: bound_year,
                period: bound_period,
            } => {
                if *bound_month == month && *bound_year == year && *bound_period == period {
                    Ok(())
                } else {
                    Err(AppError::ScopeMismatch {
                        bound_month: *bound_month as u32,
                        bound_year: *bound_year,
                        bound_period: bound_period.to_string(),
                    })
                }
            }
        }
    }

    /// Name stamped into `paid_by` on mutations under this scope.
    pub fn actor_name(&self) -> &str {
        match self {
            Scope::Role { identity } => &identity.name,
            Scope::Link { .. } => SHARED_LINK_ACTOR,
        }
    }
}
