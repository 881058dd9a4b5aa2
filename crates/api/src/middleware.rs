use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<AppServices>,
}

/// Session guard for every protected route.
///
/// Verifies the bearer token, re-reads the principal and rejects the request
/// with 401 if either step fails. Storage failures surface as 500.
pub async fn session_guard(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let Some(token) = extract_bearer(req.headers()).map(str::to_owned) else {
        return errors::unauthenticated();
    };

    let principal = match state.services.authenticator.current_principal(&token, Utc::now()).await {
        Ok(p) => p,
        Err(e) => return errors::auth_error(e),
    };

    req.extensions_mut().insert(PrincipalContext::new(principal));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
