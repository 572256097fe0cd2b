use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::models::{PaymentRecord, PaymentStatus};
use super::repository::LedgerStore;
use crate::access::Scope;
use crate::directory::{RateSnapshot, UserDirectory};
use crate::error::{AppError, AppResult};
use crate::period::{resolve_range, PaySubPeriod, PeriodSelector};
use crate::timelog::TimeLogAggregator;

/// Merges aggregated approved hours with persisted ledger rows into the
/// per-period payment view. Pure read: no row is created or modified on
/// either authorization path.
pub struct ReconciliationEngine {
    aggregator: Arc<TimeLogAggregator>,
    directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn LedgerStore>,
}

impl ReconciliationEngine {
    pub fn new(
        aggregator: Arc<TimeLogAggregator>,
        directory: Arc<dyn UserDirectory>,
        ledger: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            aggregator,
            directory,
            ledger,
        }
    }

    /// Selector a scope is allowed to read. Link scopes are pinned to
    /// their bound sub-period: an omitted selector means the bound one,
    /// anything else is a mismatch, month and year included.
    fn effective_selector(
        scope: &Scope,
        month: i32,
        year: i32,
        selector: Option<PeriodSelector>,
    ) -> AppResult<PeriodSelector> {
        match scope {
            Scope::Role { .. } => Ok(selector.unwrap_or(PeriodSelector::Full)),
            Scope::Link {
                month: bound_month,
                year: bound_year,
                period: bound_period,
            } => {
                let requested = selector.unwrap_or_else(|| (*bound_period).into());
                match requested.sub_periods() {
                    [single] => scope.ensure_period(month, year, *single)?,
                    _ => {
                        // FULL spans both sub-periods; a link binds one.
                        return Err(AppError::ScopeMismatch {
                            bound_month: *bound_month as u32,
                            bound_year: *bound_year,
                            bound_period: bound_period.to_string(),
                        });
                    }
                }
                Ok(requested)
            }
        }
    }

    /// The reconciled payment records for a month, one row per user and
    /// relevant sub-period, sorted by display name.
    pub async fn payment_records(
        &self,
        month: i32,
        year: i32,
        selector: Option<PeriodSelector>,
        scope: &Scope,
    ) -> AppResult<Vec<PaymentRecord>> {
        let selector = Self::effective_selector(scope, month, year, selector)?;
        let range = resolve_range(month as u32, year, selector);

        // Three batch reads, regardless of user count.
        let users = self.directory.list_billable_users().await?;
        let snapshot = RateSnapshot::capture(&users)?;
        let period_filter = match selector.sub_periods() {
            [single] => Some(*single),
            _ => None,
        };
        let persisted = self.ledger.rows_for_month(month, year, period_filter).await?;
        let aggregated = self.aggregator.aggregate(&range).await?;

        let mut by_key: HashMap<(Uuid, PaySubPeriod), _> = persisted
            .into_iter()
            .map(|row| ((row.user_id, row.period), row))
            .collect();

        let mut records = Vec::new();
        for user in &users {
            for &period in selector.sub_periods() {
                if let Some(row) = by_key.remove(&(user.id, period)) {
                    // Persisted rows win verbatim: historical amounts are
                    // immune to rate drift.
                    records.push(PaymentRecord {
                        user_id: row.user_id,
                        user_name: user.name.clone(),
                        bank_details: user.bank_details.clone(),
                        period: row.period,
                        month: row.month,
                        year: row.year,
                        hours: row.hours,
                        amount: row.amount,
                        status: row.status,
                        paid_at: row.paid_at,
                        paid_by: row.paid_by,
                        notes: row.notes,
                        materialized: true,
                    });
                    continue;
                }

                let hours = aggregated
                    .get(&user.id)
                    .map(|h| h.get(period))
                    .unwrap_or(Decimal::ZERO);
                if hours <= Decimal::ZERO {
                    // No contribution and no history: omitting the row
                    // keeps the listing bounded by activity, not headcount.
                    continue;
                }
                let rate = snapshot.rate_for(user.id).unwrap_or(Decimal::ZERO);
                records.push(PaymentRecord {
                    user_id: user.id,
                    user_name: user.name.clone(),
                    bank_details: user.bank_details.clone(),
                    period,
                    month,
                    year,
                    hours,
                    amount: hours * rate,
                    status: PaymentStatus::Pending,
                    paid_at: None,
                    paid_by: None,
                    notes: None,
                    materialized: false,
                });
            }
        }

        records.sort_by(|a, b| {
            a.user_name
                .to_lowercase()
                .cmp(&b.user_name.to_lowercase())
                .then_with(|| a.period.as_str().cmp(b.period.as_str()))
        });

        debug!(
            month,
            year,
            records = records.len(),
            "reconciled payment view"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Role;
    use crate::ledger::models::{LedgerKey, LedgerRow};
    use crate::testutil::{
        approved_entry, billable_user, manager_scope, InMemoryDirectory, InMemoryLedger,
        InMemoryTimeLog,
    };
    use rust_decimal_macros::dec;

    struct Fixture {
        engine: ReconciliationEngine,
        ledger: Arc<InMemoryLedger>,
    }

    fn fixture(
        entries: Vec<crate::timelog::TimeEntry>,
        users: Vec<crate::directory::DirectoryUser>,
    ) -> Fixture {
        let log = Arc::new(InMemoryTimeLog::new(entries));
        let directory = Arc::new(InMemoryDirectory::new(users));
        let ledger = Arc::new(InMemoryLedger::default());
        let engine = ReconciliationEngine::new(
            Arc::new(TimeLogAggregator::new(log)),
            directory,
            ledger.clone(),
        );
        Fixture { engine, ledger }
    }

    #[tokio::test]
    async fn test_synthesizes_virtual_row_from_approved_hours() {
        // 20 approved hours at $25/hr, no persisted row.
        let user = billable_user("Ada", dec!(25));
        let entries = vec![
            approved_entry(user.id, 2026, 3, 5, dec!(12)),
            approved_entry(user.id, 2026, 3, 10, dec!(8)),
        ];
        let fx = fixture(entries, vec![user]);

        let records = fx
            .engine
            .payment_records(3, 2026, Some(PeriodSelector::P1), &manager_scope())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.hours, dec!(20));
        assert_eq!(record.amount, dec!(500));
        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(!record.materialized);
    }

    #[tokio::test]
    async fn test_persisted_row_wins_over_rate_drift() {
        let user = billable_user("Ada", dec!(25));
        let entries = vec![approved_entry(user.id, 2026, 3, 5, dec!(10))];
        let fx = fixture(entries, vec![user.clone()]);

        // A row persisted back when the rate was $20.
        let key = LedgerKey {
            user_id: user.id,
            period: PaySubPeriod::P1,
            month: 3,
            year: 2026,
        };
        fx.ledger.seed(LedgerRow::virtual_row(&key, dec!(10), dec!(200)));

        let records = fx
            .engine
            .payment_records(3, 2026, Some(PeriodSelector::P1), &manager_scope())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, dec!(200));
        assert!(records[0].materialized);
    }

    #[tokio::test]
    async fn test_rate_drift_moves_virtual_rows_only() {
        let user = billable_user("Ada", dec!(20));
        let entries = vec![
            approved_entry(user.id, 2026, 3, 5, dec!(10)),
            approved_entry(user.id, 2026, 3, 20, dec!(10)),
        ];
        let log = Arc::new(InMemoryTimeLog::new(entries));
        let directory = Arc::new(InMemoryDirectory::new(vec![user.clone()]));
        let ledger = Arc::new(InMemoryLedger::default());
        let engine = ReconciliationEngine::new(
            Arc::new(TimeLogAggregator::new(log)),
            directory.clone(),
            ledger.clone(),
        );

        // P1 was persisted at the old $20 rate; P2 stays virtual.
        let key = LedgerKey {
            user_id: user.id,
            period: PaySubPeriod::P1,
            month: 3,
            year: 2026,
        };
        ledger.seed(LedgerRow::virtual_row(&key, dec!(10), dec!(200)));

        directory.set_rate(user.id, dec!(30));
        let records = engine
            .payment_records(3, 2026, None, &manager_scope())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].period, PaySubPeriod::P1);
        assert_eq!(records[0].amount, dec!(200)); // locked in
        assert_eq!(records[1].period, PaySubPeriod::P2);
        assert_eq!(records[1].amount, dec!(300)); // follows the snapshot
    }

    #[tokio::test]
    async fn test_zero_hours_no_history_is_omitted() {
        let active = billable_user("Ada", dec!(25));
        let idle = billable_user("Bob", dec!(30));
        let entries = vec![approved_entry(active.id, 2026, 3, 5, dec!(4))];
        let fx = fixture(entries, vec![active.clone(), idle]);

        let records = fx
            .engine
            .payment_records(3, 2026, None, &manager_scope())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, active.id);
    }

    #[tokio::test]
    async fn test_full_month_emits_separate_sub_period_rows() {
        let user = billable_user("Ada", dec!(10));
        let entries = vec![
            approved_entry(user.id, 2026, 3, 5, dec!(6)),
            approved_entry(user.id, 2026, 3, 20, dec!(4)),
        ];
        let fx = fixture(entries, vec![user]);

        let records = fx
            .engine
            .payment_records(3, 2026, None, &manager_scope())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].period, PaySubPeriod::P1);
        assert_eq!(records[0].hours, dec!(6));
        assert_eq!(records[1].period, PaySubPeriod::P2);
        assert_eq!(records[1].hours, dec!(4));
    }

    #[tokio::test]
    async fn test_sorted_by_display_name_case_insensitive() {
        let zoe = billable_user("zoe", dec!(10));
        let alan = billable_user("Alan", dec!(10));
        let entries = vec![
            approved_entry(zoe.id, 2026, 3, 5, dec!(1)),
            approved_entry(alan.id, 2026, 3, 5, dec!(1)),
        ];
        let fx = fixture(entries, vec![zoe, alan]);

        let records = fx
            .engine
            .payment_records(3, 2026, Some(PeriodSelector::P1), &manager_scope())
            .await
            .unwrap();

        let names: Vec<_> = records.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["Alan", "zoe"]);
    }

    #[tokio::test]
    async fn test_link_scope_pinned_to_bound_period() {
        let user = billable_user("Ada", dec!(25));
        let entries = vec![approved_entry(user.id, 2026, 3, 5, dec!(2))];
        let fx = fixture(entries, vec![user]);

        let scope = Scope::Link {
            month: 3,
            year: 2026,
            period: PaySubPeriod::P1,
        };

        // Omitted selector reads the bound period.
        let records = fx
            .engine
            .payment_records(3, 2026, None, &scope)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].period, PaySubPeriod::P1);

        // A different sub-period, FULL, or other coordinates: mismatch.
        for (month, year, sel) in [
            (3, 2026, Some(PeriodSelector::P2)),
            (3, 2026, Some(PeriodSelector::Full)),
            (4, 2026, Some(PeriodSelector::P1)),
            (3, 2027, None),
        ] {
            let err = fx
                .engine
                .payment_records(month, year, sel, &scope)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::ScopeMismatch { .. }));
        }
    }

    #[tokio::test]
    async fn test_scope_mismatch_reports_link_binding() {
        let user = billable_user("Ada", dec!(25));
        let entries = vec![approved_entry(user.id, 2026, 3, 5, dec!(2))];
        let fx = fixture(entries, vec![user]);

        let scope = Scope::Link {
            month: 3,
            year: 2026,
            period: PaySubPeriod::P1,
        };

        // A FULL request for entirely different coordinates: the error
        // must carry the link's binding, not the requested month/year.
        let err = fx
            .engine
            .payment_records(4, 2027, Some(PeriodSelector::Full), &scope)
            .await
            .unwrap_err();
        match err {
            AppError::ScopeMismatch {
                bound_month,
                bound_year,
                bound_period,
            } => {
                assert_eq!(bound_month, 3);
                assert_eq!(bound_year, 2026);
                assert_eq!(bound_period, "P1");
            }
            other => panic!("expected scope mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_negative_rate_is_rejected() {
        let user = billable_user("Ada", dec!(-5));
        let entries = vec![approved_entry(user.id, 2026, 3, 5, dec!(2))];
        let fx = fixture(entries, vec![user]);

        let err = fx
            .engine
            .payment_records(3, 2026, None, &manager_scope())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_read_path_never_persists() {
        let user = billable_user("Ada", dec!(25));
        let entries = vec![approved_entry(user.id, 2026, 3, 5, dec!(8))];
        let fx = fixture(entries, vec![user]);

        fx.engine
            .payment_records(3, 2026, None, &manager_scope())
            .await
            .unwrap();

        assert_eq!(fx.ledger.row_count(), 0);
    }
}
