use std::str::FromStr;

use axum::{response::Response, routing::get, Router};

use crate::app::errors;

pub mod auth;
pub mod automations;
pub mod sectors;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/dashboard/stats", get(system::dashboard_stats))
        .nest("/automations", automations::router())
        .nest("/sectors", sectors::router())
        .nest("/users", users::router())
}

/// Parse a path id, answering 400 `invalid_id` when it is not a UUID.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, Response> {
    raw.parse().map_err(|_| errors::invalid_id(what))
}
