pub mod aggregator;
pub mod models;
pub mod store;

pub use aggregator::{SubPeriodHours, TimeLogAggregator};
pub use models::{EntryStatus, TimeEntry};
pub use store::{PgTimeLogStore, TimeLogStore};
