use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Exchange email and password for a bearer token.
///
/// Unknown email and wrong password produce the same response.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(errors::json_rejection)?;

    let issued = services
        .authenticator
        .login(&body.email, &body.password, Utc::now())
        .await
        .map_err(errors::auth_error)?;

    Ok(Json(dto::TokenResponse::bearer(issued.access_token)).into_response())
}

/// The authenticated principal, as currently stored.
pub async fn me(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(dto::UserResponse::from(principal.user().clone()))
}
