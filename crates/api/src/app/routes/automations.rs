use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use autohub_auth::{authorize_resource, visible_resources, AccessRepository};
use autohub_core::AutomationId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_automations).post(create_automation))
        .route(
            "/:id",
            get(get_automation).put(update_automation).delete(delete_automation),
        )
}

/// Automations the caller can open. Administrators may pass
/// `include_inactive=true` to see the whole catalog.
pub async fn list_automations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::ListAutomationsQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query.map_err(|e| errors::validation(e.body_text()))?;
    let manage = authz::can_manage(&principal);

    let automations = if query.include_inactive {
        authz::require_manage(&principal)?;
        services.directory.list_automations().await
    } else {
        visible_resources(services.directory.as_ref(), principal.user()).await
    };
    let automations = automations.map_err(errors::store_error)?;

    let body: Vec<dto::AutomationResponse> = automations
        .into_iter()
        .map(|a| dto::AutomationResponse::new(a, manage))
        .collect();
    Ok(Json(body).into_response())
}

pub async fn get_automation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: AutomationId = parse_id(&id, "automation")?;
    let manage = authz::can_manage(&principal);

    let automation = if manage {
        // Administrators also reach inactive automations for editing.
        services
            .directory
            .find_resource_by_id(id)
            .await
            .map_err(errors::store_error)?
            .ok_or_else(|| errors::not_found("automation not found"))?
    } else {
        authorize_resource(services.directory.as_ref(), principal.user(), id)
            .await
            .map_err(errors::access_error)?
    };

    Ok(Json(dto::AutomationResponse::new(automation, manage)).into_response())
}

pub async fn create_automation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateAutomationRequest>, JsonRejection>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let Json(body) = body.map_err(errors::json_rejection)?;

    let created = services
        .directory
        .create_automation(body.into())
        .await
        .map_err(errors::store_error)?;
    tracing::info!(automation_id = %created.id, by = %principal.principal_id(), "automation created");

    Ok((StatusCode::CREATED, Json(dto::AutomationResponse::new(created, true))).into_response())
}

pub async fn update_automation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateAutomationRequest>, JsonRejection>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let id: AutomationId = parse_id(&id, "automation")?;
    let Json(body) = body.map_err(errors::json_rejection)?;

    let updated = services
        .directory
        .update_automation(id, body.into())
        .await
        .map_err(errors::store_error)?;
    tracing::info!(automation_id = %id, by = %principal.principal_id(), "automation updated");

    Ok(Json(dto::AutomationResponse::new(updated, true)).into_response())
}

pub async fn delete_automation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let id: AutomationId = parse_id(&id, "automation")?;

    services
        .directory
        .delete_automation(id)
        .await
        .map_err(errors::store_error)?;
    tracing::info!(automation_id = %id, by = %principal.principal_id(), "automation deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}
