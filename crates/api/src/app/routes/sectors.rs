use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use autohub_core::SectorId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sectors).post(create_sector))
        .route("/:id", get(get_sector).put(update_sector).delete(delete_sector))
}

pub async fn list_sectors(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let sectors = services.directory.list_sectors().await.map_err(errors::store_error)?;
    let body: Vec<dto::SectorResponse> = sectors.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}

pub async fn get_sector(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> ApiResult {
    let id: SectorId = parse_id(&id, "sector")?;
    match services.directory.get_sector(id).await.map_err(errors::store_error)? {
        Some(sector) => Ok(Json(dto::SectorResponse::from(sector)).into_response()),
        None => Err(errors::not_found("sector not found")),
    }
}

pub async fn create_sector(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateSectorRequest>, JsonRejection>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let Json(body) = body.map_err(errors::json_rejection)?;

    let sector = services
        .directory
        .create_sector(body.into())
        .await
        .map_err(errors::store_error)?;
    tracing::info!(sector_id = %sector.id, slug = %sector.slug, "sector created");

    Ok((StatusCode::CREATED, Json(dto::SectorResponse::from(sector))).into_response())
}

pub async fn update_sector(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateSectorRequest>, JsonRejection>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let id: SectorId = parse_id(&id, "sector")?;
    let Json(body) = body.map_err(errors::json_rejection)?;

    let sector = services
        .directory
        .update_sector(id, body.into())
        .await
        .map_err(errors::store_error)?;

    Ok(Json(dto::SectorResponse::from(sector)).into_response())
}

/// Refused with `sector_in_use` while any principal still belongs to it.
pub async fn delete_sector(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let id: SectorId = parse_id(&id, "sector")?;

    services.directory.delete_sector(id).await.map_err(errors::store_error)?;
    tracing::info!(sector_id = %id, by = %principal.principal_id(), "sector deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}
