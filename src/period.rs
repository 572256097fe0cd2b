use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;

use crate::error::AppError;

/// Persisted sub-period of a month. P1 covers days 1-15, P2 covers
/// day 16 through the end of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "pay_period", rename_all = "UPPERCASE")]
pub enum PaySubPeriod {
    P1,
    P2,
}

impl fmt::Display for PaySubPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PaySubPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaySubPeriod::P1 => "P1",
            PaySubPeriod::P2 => "P2",
        }
    }
}

/// Query selector for a pay-period range. `Full` is the union of P1 and P2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodSelector {
    P1,
    P2,
    Full,
}

impl PeriodSelector {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "P1" | "p1" => Ok(PeriodSelector::P1),
            "P2" | "p2" => Ok(PeriodSelector::P2),
            "FULL" | "full" | "Full" => Ok(PeriodSelector::Full),
            other => Err(AppError::Validation(format!(
                "Unknown period selector: {}",
                other
            ))),
        }
    }

    /// The sub-periods a selector covers, in calendar order.
    pub fn sub_periods(&self) -> &'static [PaySubPeriod] {
        match self {
            PeriodSelector::P1 => &[PaySubPeriod::P1],
            PeriodSelector::P2 => &[PaySubPeriod::P2],
            PeriodSelector::Full => &[PaySubPeriod::P1, PaySubPeriod::P2],
        }
    }
}

impl From<PaySubPeriod> for PeriodSelector {
    fn from(period: PaySubPeriod) -> Self {
        match period {
            PaySubPeriod::P1 => PeriodSelector::P1,
            PaySubPeriod::P2 => PeriodSelector::P2,
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Last calendar day of a month, leap years included.
pub fn last_day_of_month(month: u32, year: i32) -> u32 {
    assert!((1..=12).contains(&month), "month out of range: {}", month);
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // First of next month minus one day is always a valid date.
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Resolve a (month, year, selector) triple to an inclusive date range.
///
/// Months outside 1..=12 are a caller contract violation and panic rather
/// than wrapping into an adjacent month.
pub fn resolve_range(month: u32, year: i32, selector: PeriodSelector) -> DateRange {
    assert!((1..=12).contains(&month), "month out of range: {}", month);
    let last = last_day_of_month(month, year);
    let (start_day, end_day) = match selector {
        PeriodSelector::P1 => (1, 15),
        PeriodSelector::P2 => (16, last),
        PeriodSelector::Full => (1, last),
    };
    DateRange {
        start: NaiveDate::from_ymd_opt(year, month, start_day)
            .unwrap_or_else(|| panic!("invalid period start {}-{}-{}", year, month, start_day)),
        end: NaiveDate::from_ymd_opt(year, month, end_day)
            .unwrap_or_else(|| panic!("invalid period end {}-{}-{}", year, month, end_day)),
    }
}

/// Sub-period an individual calendar day belongs to. Independent of any
/// queried selector: a FULL-month query still buckets entries by their own
/// day-of-month.
pub fn sub_period_for(date: NaiveDate) -> PaySubPeriod {
    if date.day() <= 15 {
        PaySubPeriod::P1
    } else {
        PaySubPeriod::P2
    }
}
