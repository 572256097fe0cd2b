pub mod models;
pub mod mutator;
pub mod reconciliation;
pub mod repository;

pub use models::{LedgerKey, LedgerRow, PaymentRecord, PaymentStatus};
pub use mutator::LedgerMutator;
pub use reconciliation::ReconciliationEngine;
pub use repository::{LedgerStore, PgLedgerStore};
