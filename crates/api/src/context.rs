use autohub_auth::Principal;
use autohub_core::{PrincipalId, User};

/// Authenticated caller for a request, inserted by the session guard.
///
/// Present on every protected route.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal.id()
    }

    /// The principal row as re-read for this request.
    pub fn user(&self) -> &User {
        &self.principal.user
    }
}
