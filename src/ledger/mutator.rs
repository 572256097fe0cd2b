use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use super::models::{LedgerKey, LedgerRow};
use super::repository::LedgerStore;
use crate::access::{Scope, SHARED_LINK_ACTOR};
use crate::directory::{RateSnapshot, UserDirectory};
use crate::error::{AppError, AppResult};
use crate::timelog::TimeLogAggregator;

/// Status transitions on the ledger.
///
/// The write path requires a persisted row. When none exists yet, the
/// mutator promotes the virtual row first - an explicit materialization
/// from aggregated hours and the current rate snapshot - and then applies
/// the transition with a single conditional update. A period with no
/// payable hours and no history fails `NotFound`.
pub struct LedgerMutator {
    ledger: Arc<dyn LedgerStore>,
    aggregator: Arc<TimeLogAggregator>,
    directory: Arc<dyn UserDirectory>,
}

impl LedgerMutator {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        aggregator: Arc<TimeLogAggregator>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            ledger,
            aggregator,
            directory,
        }
    }

    fn check_scope(key: &LedgerKey, scope: &Scope) -> AppResult<()> {
        match scope {
            Scope::Role { identity } => {
                if identity.role.can_administer_payments() {
                    Ok(())
                } else {
                    Err(AppError::Forbidden(identity.role.to_string()))
                }
            }
            Scope::Link { .. } => scope.ensure_period(key.month, key.year, key.period),
        }
    }

    /// Mark a user's pay period as paid. Idempotent: repeating the call
    /// re-stamps `paid_at` and `paid_by`.
    pub async fn mark_paid(
        &self,
        key: &LedgerKey,
        actor: &str,
        scope: &Scope,
    ) -> AppResult<LedgerRow> {
        Self::check_scope(key, scope)?;
        // Links are anonymous: a caller-supplied actor never sticks.
        let actor = match scope {
            Scope::Link { .. } => SHARED_LINK_ACTOR,
            Scope::Role { .. } => actor,
        };

        if let Some(row) = self.ledger.set_paid(key, actor).await? {
            info!(user_id = %key.user_id, period = %key.period, "payment marked paid");
            return Ok(row);
        }

        self.materialize(key).await?;
        let row = self
            .ledger
            .set_paid(key, actor)
            .await?
            .ok_or_else(|| AppError::Internal("ledger row lost after promotion".to_string()))?;
        info!(user_id = %key.user_id, period = %key.period, "payment materialized and marked paid");
        Ok(row)
    }

    /// Mark a user's pay period as pending, clearing the paid stamp.
    /// A no-op beyond that when the row is already pending.
    pub async fn mark_pending(&self, key: &LedgerKey, scope: &Scope) -> AppResult<LedgerRow> {
        Self::check_scope(key, scope)?;

        if let Some(row) = self.ledger.set_pending(key).await? {
            info!(user_id = %key.user_id, period = %key.period, "payment marked pending");
            return Ok(row);
        }

        self.materialize(key).await?;
        let row = self
            .ledger
            .set_pending(key)
            .await?
            .ok_or_else(|| AppError::Internal("ledger row lost after promotion".to_string()))?;
        Ok(row)
    }

    /// Promote the virtual row for a key: aggregate the user's approved
    /// hours over the sub-period and price them with the snapshot rate.
    /// Insert-if-absent keeps racing promotions down to one surviving row.
    async fn materialize(&self, key: &LedgerKey) -> AppResult<()> {
        let range = resolve_key_range(key);
        let aggregated = self.aggregator.aggregate(&range).await?;
        let hours = aggregated
            .get(&key.user_id)
            .map(|h| h.get(key.period))
            .unwrap_or(Decimal::ZERO);

        if hours <= Decimal::ZERO {
            return Err(AppError::NotFound(format!(
                "No payable hours for user {} in {}/{} {}",
                key.user_id, key.month, key.year, key.period
            )));
        }

        let users = self.directory.list_billable_users().await?;
        let snapshot = RateSnapshot::capture(&users)?;
        let rate = snapshot
            .rate_for(key.user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not in directory", key.user_id)))?;

        let row = LedgerRow::virtual_row(key, hours, hours * rate);
        self.ledger.insert_if_absent(&row).await?;
        Ok(())
    }
}

fn resolve_key_range(key: &LedgerKey) -> crate::period::DateRange {
    crate::period::resolve_range(key.month as u32, key.year, key.period.into())
}
