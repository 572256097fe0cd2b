use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::models::EntryStatus;
use super::store::TimeLogStore;
use crate::error::AppResult;
use crate::period::{sub_period_for, DateRange, PaySubPeriod};

/// Approved hours for one user, bucketed by sub-period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubPeriodHours {
    pub p1: Decimal,
    pub p2: Decimal,
}

impl SubPeriodHours {
    pub fn get(&self, period: PaySubPeriod) -> Decimal {
        match period {
            PaySubPeriod::P1 => self.p1,
            PaySubPeriod::P2 => self.p2,
        }
    }

    fn add(&mut self, period: PaySubPeriod, hours: Decimal) {
        match period {
            PaySubPeriod::P1 => self.p1 += hours,
            PaySubPeriod::P2 => self.p2 += hours,
        }
    }
}

/// Sums approved hours per user over a date range.
pub struct TimeLogAggregator {
    store: Arc<dyn TimeLogStore>,
}

impl TimeLogAggregator {
    pub fn new(store: Arc<dyn TimeLogStore>) -> Self {
        Self { store }
    }

    /// One batch fetch over the range, then an in-memory rollup.
    ///
    /// Each entry lands in the bucket of its own day-of-month, so a
    /// FULL-month range still splits contributions into P1/P2 for
    /// downstream per-period views.
    pub async fn aggregate(&self, range: &DateRange) -> AppResult<HashMap<Uuid, SubPeriodHours>> {
        let entries = self.store.approved_entries(range).await?;

        let mut totals: HashMap<Uuid, SubPeriodHours> = HashMap::new();
        for entry in entries {
            // The store contract already filters, but a misbehaving
            // implementation must not leak unapproved hours into billing.
            if entry.status != EntryStatus::Approved {
                continue;
            }
            if !range.contains(entry.date) {
                continue;
            }
            totals
                .entry(entry.user_id)
                .or_default()
                .add(sub_period_for(entry.date), entry.hours);
        }

        Ok(totals)
    }
}
