use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::models::{LedgerKey, LedgerRow};
use crate::error::AppResult;
use crate::period::PaySubPeriod;

/// Persistence seam for the payment ledger.
///
/// Every mutation is a single atomic statement against the uniqueness
/// key; there is no read-then-write anywhere behind this trait. Two
/// racing writers for the same key can never produce two rows.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// All persisted rows for a month, optionally filtered to one
    /// sub-period. One query.
    async fn rows_for_month(
        &self,
        month: i32,
        year: i32,
        period: Option<PaySubPeriod>,
    ) -> AppResult<Vec<LedgerRow>>;

    /// Promote a virtual row. Returns false when a row already owned the
    /// key, in which case the stored row stands untouched.
    async fn insert_if_absent(&self, row: &LedgerRow) -> AppResult<bool>;

    /// Conditionally mark paid, stamping `paid_at`/`paid_by`. `None` when
    /// no row owns the key. Safe to repeat: a second call re-stamps.
    async fn set_paid(&self, key: &LedgerKey, actor: &str) -> AppResult<Option<LedgerRow>>;

    /// Conditionally mark pending, clearing `paid_at`/`paid_by`.
    async fn set_pending(&self, key: &LedgerKey) -> AppResult<Option<LedgerRow>>;
}

/// Postgres-backed payment ledger.
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ROW_COLUMNS: &str = "user_id, period, month, year, hours, amount, status, \
                           paid_at, paid_by, notes, created_at, updated_at";

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn rows_for_month(
        &self,
        month: i32,
        year: i32,
        period: Option<PaySubPeriod>,
    ) -> AppResult<Vec<LedgerRow>> {
        let rows = match period {
            Some(period) => {
                sqlx::query_as::<_, LedgerRow>(&format!(
                    "SELECT {ROW_COLUMNS} FROM payment_ledger \
                     WHERE month = $1 AND year = $2 AND period = $3"
                ))
                .bind(month)
                .bind(year)
                .bind(period)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, LedgerRow>(&format!(
                    "SELECT {ROW_COLUMNS} FROM payment_ledger \
                     WHERE month = $1 AND year = $2"
                ))
                .bind(month)
                .bind(year)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    async fn insert_if_absent(&self, row: &LedgerRow) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_ledger
                (user_id, period, month, year, hours, amount, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, period, month, year) DO NOTHING
            "#,
        )
        .bind(row.user_id)
        .bind(row.period)
        .bind(row.month)
        .bind(row.year)
        .bind(row.hours)
        .bind(row.amount)
        .bind(row.status)
        .bind(&row.notes)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_paid(&self, key: &LedgerKey, actor: &str) -> AppResult<Option<LedgerRow>> {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "UPDATE payment_ledger \
             SET status = 'paid', paid_at = $5, paid_by = $6, updated_at = $5 \
             WHERE user_id = $1 AND period = $2 AND month = $3 AND year = $4 \
             RETURNING {ROW_COLUMNS}"
        ))
        .bind(key.user_id)
        .bind(key.period)
        .bind(key.month)
        .bind(key.year)
        .bind(Utc::now())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_pending(&self, key: &LedgerKey) -> AppResult<Option<LedgerRow>> {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "UPDATE payment_ledger \
             SET status = 'pending', paid_at = NULL, paid_by = NULL, updated_at = $5 \
             WHERE user_id = $1 AND period = $2 AND month = $3 AND year = $4 \
             RETURNING {ROW_COLUMNS}"
        ))
        .bind(key.user_id)
        .bind(key.period)
        .bind(key.month)
        .bind(key.year)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
