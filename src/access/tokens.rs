use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::models::{Scope, SharedLink, SharedLinkValidation};
use crate::error::{AppError, AppResult};
use crate::period::PaySubPeriod;

/// Persistence seam for shared links. Uniqueness on both the token string
/// and the (month, year, period) triple is enforced by the store.
#[async_trait]
pub trait SharedLinkStore: Send + Sync {
    /// Insert unless a link already exists for the same period triple;
    /// returns the surviving row either way. This is the idempotent-mint
    /// primitive and must hold under racing writers. `None` means the
    /// insert conflicted but the winning row was revoked before it could
    /// be read; the caller may retry with a fresh token.
    async fn insert_if_absent(&self, link: SharedLink) -> AppResult<Option<SharedLink>>;

    async fn find(&self, token: &str) -> AppResult<Option<SharedLink>>;

    /// Delete the binding. Returns false when the token was unknown.
    async fn delete(&self, token: &str) -> AppResult<bool>;
}

/// Postgres-backed shared-link store.
pub struct PgSharedLinkStore {
    pool: PgPool,
}

impl PgSharedLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SharedLinkStore for PgSharedLinkStore {
    async fn insert_if_absent(&self, link: SharedLink) -> AppResult<Option<SharedLink>> {
        let inserted = sqlx::query_as::<_, SharedLink>(
            r#"
            INSERT INTO shared_links (token, month, year, period, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (month, year, period) DO NOTHING
            RETURNING token, month, year, period, created_at, expires_at
            "#,
        )
        .bind(&link.token)
        .bind(link.month)
        .bind(link.year)
        .bind(link.period)
        .bind(link.created_at)
        .bind(link.expires_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(Some(row));
        }

        // Lost the insert race (or the link pre-existed): return the row
        // that owns the triple. A racing revoke can delete that row before
        // this select runs, which surfaces as None.
        let existing = sqlx::query_as::<_, SharedLink>(
            r#"
            SELECT token, month, year, period, created_at, expires_at
            FROM shared_links
            WHERE month = $1 AND year = $2 AND period = $3
            "#,
        )
        .bind(link.month)
        .bind(link.year)
        .bind(link.period)
        .fetch_optional(&self.pool)
        .await?;

        Ok(existing)
    }

    async fn find(&self, token: &str) -> AppResult<Option<SharedLink>> {
        let link = sqlx::query_as::<_, SharedLink>(
            r#"
            SELECT token, month, year, period, created_at, expires_at
            FROM shared_links
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    async fn delete(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM shared_links WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Mints, validates and revokes pay-period capability tokens.
pub struct CapabilityTokenAuthority {
    store: Arc<dyn SharedLinkStore>,
    link_ttl: Option<Duration>,
}

impl CapabilityTokenAuthority {
    pub fn new(store: Arc<dyn SharedLinkStore>, link_ttl: Option<Duration>) -> Self {
        Self { store, link_ttl }
    }

    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        hex::encode(bytes)
    }

    /// Mint a link for a pay period, or return the existing one unchanged.
    ///
    /// Role-gated: only Manager/Finance sessions may mint, and a link can
    /// never mint another link.
    pub async fn mint(
        &self,
        month: i32,
        year: i32,
        period: PaySubPeriod,
        scope: &Scope,
    ) -> AppResult<SharedLink> {
        match scope {
            Scope::Role { identity } if identity.role.can_administer_payments() => {}
            Scope::Role { identity } => {
                return Err(AppError::Forbidden(identity.role.to_string()));
            }
            Scope::Link { .. } => return Err(AppError::Unauthorized),
        }

        // A revoke can race the insert's conflict path and delete the
        // winning row before it is read back; one retry with a fresh
        // token covers that window.
        for _ in 0..2 {
            let now = Utc::now();
            let candidate = SharedLink {
                token: Self::generate_token(),
                month,
                year,
                period,
                created_at: now,
                expires_at: self.link_ttl.map(|ttl| now + ttl),
            };

            if let Some(link) = self.store.insert_if_absent(candidate).await? {
                info!(month, year, period = %period, "shared link ready");
                return Ok(link);
            }
        }

        Err(AppError::Internal(
            "shared link vanished while minting".to_string(),
        ))
    }

    /// Pure lookup, no authorization required: this IS the authorization
    /// primitive for the public path. Read-only and safe to call
    /// concurrently and repeatedly.
    pub async fn validate(&self, token: &str) -> AppResult<SharedLinkValidation> {
        match self.store.find(token).await? {
            Some(link) if !link.is_expired(Utc::now()) => Ok(SharedLinkValidation::ok(&link)),
            _ => Ok(SharedLinkValidation::invalid()),
        }
    }

    /// Resolve a token to its bound link, for the access gate.
    pub async fn resolve(&self, token: &str) -> AppResult<SharedLink> {
        match self.store.find(token).await? {
            Some(link) if !link.is_expired(Utc::now()) => Ok(link),
            _ => Err(AppError::InvalidToken),
        }
    }

    /// Delete the binding; any validation after this rejects.
    pub async fn revoke(&self, token: &str, scope: &Scope) -> AppResult<bool> {
        match scope {
            Scope::Role { identity } if identity.role.can_administer_payments() => {}
            Scope::Role { identity } => {
                return Err(AppError::Forbidden(identity.role.to_string()));
            }
            Scope::Link { .. } => return Err(AppError::Unauthorized),
        }

        let deleted = self.store.delete(token).await?;
        if deleted {
            info!("shared link revoked");
        }
        Ok(deleted)
    }
}
