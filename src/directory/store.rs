use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{DirectoryUser, SessionIdentity};
use crate::error::AppResult;

/// Read seam over the user directory. A single query returns every
/// billable user with rate and bank details.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_billable_users(&self) -> AppResult<Vec<DirectoryUser>>;
}

/// Seam over the external session mechanism: an opaque session token
/// resolves to an identity with a role, or nothing.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn resolve(&self, session_token: &str) -> AppResult<Option<SessionIdentity>>;
}

/// Postgres-backed directory and session lookup.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn list_billable_users(&self) -> AppResult<Vec<DirectoryUser>> {
        let users = sqlx::query_as::<_, DirectoryUser>(
            r#"
            SELECT id, name, hourly_rate, bank_details
            FROM users
            WHERE role IN ('developer', 'manager', 'leadership', 'finance')
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

#[async_trait]
impl SessionProvider for PgUserDirectory {
    async fn resolve(&self, session_token: &str) -> AppResult<Option<SessionIdentity>> {
        let identity = sqlx::query_as::<_, SessionIdentity>(
            r#"
            SELECT u.id AS user_id, u.name, u.role
            FROM sessions s
            INNER JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }
}
