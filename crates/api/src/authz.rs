//! API-side authorization guards.
//!
//! Decisions come from `autohub_auth::access`; this module only turns a
//! denial into the HTTP response.

use axum::response::Response;

use crate::app::errors;
use crate::context::PrincipalContext;

pub fn can_manage(principal: &PrincipalContext) -> bool {
    autohub_auth::can_manage(principal.user())
}

/// Gate for every administrative write.
pub fn require_manage(principal: &PrincipalContext) -> Result<(), Response> {
    autohub_auth::require_manage(principal.user()).map_err(|e| {
        tracing::warn!(principal_id = %principal.principal_id(), "administrative action refused");
        errors::access_error(e)
    })
}
