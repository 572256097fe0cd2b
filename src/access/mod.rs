pub mod gate;
pub mod models;
pub mod tokens;

pub use gate::AccessGate;
pub use models::{Credentials, Scope, SharedLink, SharedLinkValidation, SHARED_LINK_ACTOR};
pub use tokens::{CapabilityTokenAuthority, PgSharedLinkStore, SharedLinkStore};
