//! In-memory fakes for the store seams, used by unit tests across the
//! crate. Fakes mirror the atomic semantics of the Postgres stores
//! (insert-if-absent, conditional update) over a mutex-guarded map.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::access::{SharedLink, SharedLinkStore};
use crate::directory::{DirectoryUser, Role, SessionIdentity, UserDirectory};
use crate::error::AppResult;
use crate::ledger::{LedgerKey, LedgerRow, LedgerStore, PaymentStatus};
use crate::period::{DateRange, PaySubPeriod};
use crate::timelog::{EntryStatus, TimeEntry, TimeLogStore};

// ---- fixtures ----

pub fn approved_entry(user_id: Uuid, year: i32, month: u32, day: u32, hours: Decimal) -> TimeEntry {
    entry_with_status(user_id, year, month, day, hours, EntryStatus::Approved)
}

pub fn entry_with_status(
    user_id: Uuid,
    year: i32,
    month: u32,
    day: u32,
    hours: Decimal,
    status: EntryStatus,
) -> TimeEntry {
    TimeEntry {
        id: Uuid::new_v4(),
        user_id,
        date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
        hours,
        status,
    }
}

pub fn billable_user(name: &str, hourly_rate: Decimal) -> DirectoryUser {
    DirectoryUser {
        id: Uuid::new_v4(),
        name: name.to_string(),
        hourly_rate,
        bank_details: None,
    }
}

pub fn session(name: &str, role: Role) -> SessionIdentity {
    SessionIdentity {
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        role,
    }
}

pub fn role_scope(role: Role) -> crate::access::Scope {
    crate::access::Scope::Role {
        identity: session("test-actor", role),
    }
}

pub fn manager_scope() -> crate::access::Scope {
    role_scope(Role::Manager)
}

// ---- time log ----

/// Fake log store. Filters by range only, NOT by status: the aggregator
/// must hold its own line against unapproved entries leaking through.
pub struct InMemoryTimeLog {
    entries: Vec<TimeEntry>,
    fetches: AtomicUsize,
}

impl InMemoryTimeLog {
    pub fn new(entries: Vec<TimeEntry>) -> Self {
        Self {
            entries,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeLogStore for InMemoryTimeLog {
    async fn approved_entries(&self, range: &DateRange) -> AppResult<Vec<TimeEntry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .iter()
            .filter(|e| range.contains(e.date))
            .cloned()
            .collect())
    }
}

// ---- directory ----

pub struct InMemoryDirectory {
    users: Mutex<Vec<DirectoryUser>>,
}

impl InMemoryDirectory {
    pub fn new(users: Vec<DirectoryUser>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    pub fn set_rate(&self, user_id: Uuid, rate: Decimal) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.hourly_rate = rate;
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn list_billable_users(&self) -> AppResult<Vec<DirectoryUser>> {
        Ok(self.users.lock().unwrap().clone())
    }
}

// ---- ledger ----

#[derive(Default)]
pub struct InMemoryLedger {
    rows: Mutex<HashMap<LedgerKey, LedgerRow>>,
}

impl InMemoryLedger {
    pub fn seed(&self, row: LedgerRow) {
        self.rows.lock().unwrap().insert(row.key(), row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn insert_if_absent_sync(&self, row: &LedgerRow) -> bool {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&row.key()) {
            false
        } else {
            rows.insert(row.key(), row.clone());
            true
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn rows_for_month(
        &self,
        month: i32,
        year: i32,
        period: Option<PaySubPeriod>,
    ) -> AppResult<Vec<LedgerRow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.month == month && r.year == year)
            .filter(|r| period.map_or(true, |p| r.period == p))
            .cloned()
            .collect())
    }

    async fn insert_if_absent(&self, row: &LedgerRow) -> AppResult<bool> {
        Ok(self.insert_if_absent_sync(row))
    }

    async fn set_paid(&self, key: &LedgerKey, actor: &str) -> AppResult<Option<LedgerRow>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(key).map(|row| {
            row.status = PaymentStatus::Paid;
            row.paid_at = Some(Utc::now());
            row.paid_by = Some(actor.to_string());
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn set_pending(&self, key: &LedgerKey) -> AppResult<Option<LedgerRow>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(key).map(|row| {
            row.status = PaymentStatus::Pending;
            row.paid_at = None;
            row.paid_by = None;
            row.updated_at = Utc::now();
            row.clone()
        }))
    }
}

// ---- shared links ----

#[derive(Default)]
pub struct InMemoryLinkStore {
    links: Mutex<HashMap<String, SharedLink>>,
}

impl InMemoryLinkStore {
    pub fn seed(&self, link: SharedLink) {
        self.links.lock().unwrap().insert(link.token.clone(), link);
    }
}

#[async_trait]
impl SharedLinkStore for InMemoryLinkStore {
    async fn insert_if_absent(&self, link: SharedLink) -> AppResult<Option<SharedLink>> {
        let mut links = self.links.lock().unwrap();
        if let Some(existing) = links
            .values()
            .find(|l| l.month == link.month && l.year == link.year && l.period == link.period)
        {
            return Ok(Some(existing.clone()));
        }
        links.insert(link.token.clone(), link.clone());
        Ok(Some(link))
    }

    async fn find(&self, token: &str) -> AppResult<Option<SharedLink>> {
        Ok(self.links.lock().unwrap().get(token).cloned())
    }

    async fn delete(&self, token: &str) -> AppResult<bool> {
        Ok(self.links.lock().unwrap().remove(token).is_some())
    }
}
