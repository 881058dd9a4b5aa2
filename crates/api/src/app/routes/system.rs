use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;

use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn root(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(json!({
        "name": services.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Catalog totals; administrators only.
pub async fn dashboard_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    crate::authz::require_manage(&principal)?;

    let counts = services.directory.counts().await.map_err(errors::store_error)?;
    Ok(Json(counts).into_response())
}
