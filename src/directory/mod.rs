pub mod models;
pub mod store;

pub use models::{DirectoryUser, RateSnapshot, Role, SessionIdentity};
pub use store::{PgUserDirectory, SessionProvider, UserDirectory};
