use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{EntryStatus, TimeEntry};
use crate::error::AppResult;
use crate::period::DateRange;

/// Read seam over the append-only time-entry log.
///
/// Contract: one batch fetch per range. Callers must never loop this
/// per user; the read path scales with log volume, not user count.
#[async_trait]
pub trait TimeLogStore: Send + Sync {
    async fn approved_entries(&self, range: &DateRange) -> AppResult<Vec<TimeEntry>>;
}

/// Postgres-backed time-entry log.
pub struct PgTimeLogStore {
    pool: PgPool,
}

impl PgTimeLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimeLogStore for PgTimeLogStore {
    async fn approved_entries(&self, range: &DateRange) -> AppResult<Vec<TimeEntry>> {
        let entries = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, date, hours, status
            FROM time_entries
            WHERE status = $1 AND date >= $2 AND date <= $3
            "#,
        )
        .bind(EntryStatus::Approved)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
