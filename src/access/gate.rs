use std::sync::Arc;

use super::models::{Credentials, Scope};
use super::tokens::CapabilityTokenAuthority;
use crate::directory::Role;
use crate::error::{AppError, AppResult};

/// Single entry point unifying the two authorization paths. Handlers
/// build `Credentials` once and every downstream operation receives a
/// resolved `Scope`; nothing else in the codebase inspects tokens or
/// session headers.
pub struct AccessGate {
    authority: Arc<CapabilityTokenAuthority>,
}

impl AccessGate {
    pub fn new(authority: Arc<CapabilityTokenAuthority>) -> Self {
        Self { authority }
    }

    /// Resolve credentials to a scope.
    ///
    /// A supplied token wins and delegates to the token authority; its
    /// failure is `InvalidToken`, never a fallback to the session. With
    /// no token, the session role must be in `allowed_roles`. Absence of
    /// both is an immediate `Unauthorized` - there is no third path.
    pub async fn authorize(
        &self,
        credentials: &Credentials,
        allowed_roles: &[Role],
    ) -> AppResult<Scope> {
        match credentials {
            Credentials::SharedToken(token) => {
                let link = self.authority.resolve(token).await?;
                Ok(Scope::Link {
                    month: link.month,
                    year: link.year,
                    period: link.period,
                })
            }
            Credentials::Session(identity) => {
                if allowed_roles.contains(&identity.role) {
                    Ok(Scope::Role {
                        identity: identity.clone(),
                    })
                } else {
                    Err(AppError::Forbidden(identity.role.to_string()))
                }
            }
            Credentials::Anonymous => Err(AppError::Unauthorized),
        }
    }

    /// Session-only authorization for operations a link may never perform
    /// (minting and revoking links).
    pub async fn require_role(
        &self,
        credentials: &Credentials,
        allowed_roles: &[Role],
    ) -> AppResult<Scope> {
        match credentials {
            Credentials::Session(_) => self.authorize(credentials, allowed_roles).await,
            Credentials::SharedToken(_) | Credentials::Anonymous => Err(AppError::Unauthorized),
        }
    }
}

/// Roles that may read the reconciled ledger through a session.
pub const READ_ROLES: [Role; 4] = [
    Role::Manager,
    Role::Developer,
    Role::Leadership,
    Role::Finance,
];

/// Roles that may mutate payment status or manage shared links.
pub const ADMIN_ROLES: [Role; 2] = [Role::Manager, Role::Finance];
