use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use uuid::Uuid;

use crate::period::PaySubPeriod;

/// Payment status of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// Uniqueness key of the ledger: at most one row per user, sub-period,
/// month and year. The constraint lives in the store, not only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub user_id: Uuid,
    pub period: PaySubPeriod,
    pub month: i32,
    pub year: i32,
}

/// The authoritative persisted payroll record for one user/period.
///
/// Rows are created lazily: the read path synthesizes virtual records and
/// only the first status mutation persists one. Once persisted, `hours`
/// and `amount` are locked in; later rate changes never rewrite them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerRow {
    pub user_id: Uuid,
    pub period: PaySubPeriod,
    pub month: i32,
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub hours: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerRow {
    pub fn key(&self) -> LedgerKey {
        LedgerKey {
            user_id: self.user_id,
            period: self.period,
            month: self.month,
            year: self.year,
        }
    }

    /// A freshly computed, not-yet-persisted row awaiting promotion.
    pub fn virtual_row(key: &LedgerKey, hours: Decimal, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            user_id: key.user_id,
            period: key.period,
            month: key.month,
            year: key.year,
            hours,
            amount,
            status: PaymentStatus::Pending,
            paid_at: None,
            paid_by: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Read-model row emitted by reconciliation: ledger data joined with the
/// directory, plus an explicit marker distinguishing persisted rows from
/// virtual ones that exist only in this response.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub user_id: Uuid,
    pub user_name: String,
    pub bank_details: Option<String>,
    pub period: PaySubPeriod,
    pub month: i32,
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub hours: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<String>,
    pub notes: Option<String>,
    pub materialized: bool,
}
