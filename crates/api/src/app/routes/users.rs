use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};

use autohub_auth::{hash_password_blocking, AccessRepository, StoreError};
use autohub_core::{NewUser, PrincipalId, UserPatch};

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(super::auth::me))
        .route("/me/preferences", put(update_my_preferences))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

async fn hash(password: String) -> Result<String, Response> {
    if password.is_empty() {
        return Err(errors::validation("password must not be empty"));
    }
    hash_password_blocking(password)
        .await
        .map_err(|e| errors::store_error(StoreError::Backend(e.to_string())))
}

/// Replace the caller's preferences blob. The only change a principal may
/// make to its own account.
pub async fn update_my_preferences(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::UpdatePreferencesRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(errors::json_rejection)?;

    let patch = UserPatch {
        preferences: Some(body.preferences),
        ..UserPatch::default()
    };
    let user = services
        .directory
        .update_user(principal.principal_id(), patch)
        .await
        .map_err(errors::store_error)?;

    Ok(Json(dto::UserResponse::from(user)).into_response())
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require_manage(&principal)?;

    let users = services.directory.list_users().await.map_err(errors::store_error)?;
    let body: Vec<dto::UserResponse> = users.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let id: PrincipalId = parse_id(&id, "user")?;

    match services.directory.find_principal_by_id(id).await.map_err(errors::store_error)? {
        Some(user) => Ok(Json(dto::UserResponse::from(user)).into_response()),
        None => Err(errors::not_found("user not found")),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let Json(body) = body.map_err(errors::json_rejection)?;

    let password_hash = hash(body.password).await?;
    let user = services
        .directory
        .create_user(NewUser {
            email: body.email,
            password_hash,
            full_name: body.full_name,
            role: body.role,
            is_admin: body.is_admin,
            sector_id: body.sector_id,
            preferences: body.preferences,
        })
        .await
        .map_err(errors::store_error)?;
    tracing::info!(principal_id = %user.id, by = %principal.principal_id(), "user created");

    Ok((StatusCode::CREATED, Json(dto::UserResponse::from(user))).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let id: PrincipalId = parse_id(&id, "user")?;
    let Json(body) = body.map_err(errors::json_rejection)?;

    let password_hash = match body.password {
        Some(password) => Some(hash(password).await?),
        None => None,
    };
    let patch = UserPatch {
        email: body.email,
        full_name: body.full_name,
        role: body.role,
        is_admin: body.is_admin,
        is_active: body.is_active,
        sector_id: body.sector_id,
        password_hash,
        preferences: body.preferences,
    };

    let user = services
        .directory
        .update_user(id, patch)
        .await
        .map_err(errors::store_error)?;
    tracing::info!(principal_id = %id, by = %principal.principal_id(), "user updated");

    Ok(Json(dto::UserResponse::from(user)).into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_manage(&principal)?;
    let id: PrincipalId = parse_id(&id, "user")?;

    if id == principal.principal_id() {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "cannot_delete_self",
            "cannot delete your own account",
        ));
    }

    services.directory.delete_user(id).await.map_err(errors::store_error)?;
    tracing::info!(principal_id = %id, by = %principal.principal_id(), "user deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}
