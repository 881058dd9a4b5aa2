use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use autohub_auth::{AccessError, AuthError, StoreError};

pub type ApiResult = Result<Response, Response>;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn with_bearer_challenge(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

pub fn unauthenticated() -> Response {
    with_bearer_challenge(json_error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "could not validate credentials",
    ))
}

pub fn not_found(message: impl Into<String>) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn invalid_id(what: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

pub fn validation(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

fn internal(detail: impl core::fmt::Display) -> Response {
    tracing::error!(error = %detail, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}

pub fn auth_error(err: AuthError) -> Response {
    match err {
        AuthError::InvalidCredentials => with_bearer_challenge(json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            err.to_string(),
        )),
        AuthError::AccountInactive => json_error(StatusCode::FORBIDDEN, "account_inactive", err.to_string()),
        AuthError::Unauthenticated => unauthenticated(),
        AuthError::Store(e) => store_error(e),
        AuthError::Token(e) => internal(e),
    }
}

pub fn access_error(err: AccessError) -> Response {
    match err {
        AccessError::Forbidden => json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "you do not have access to this resource",
        ),
        AccessError::NotFound => not_found("not found"),
        AccessError::Store(e) => store_error(e),
    }
}

pub fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => not_found("not found"),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Validation(msg) => validation(msg),
        StoreError::InUse(msg) => json_error(
            StatusCode::BAD_REQUEST,
            "sector_in_use",
            format!("cannot delete sector with users; reassign them first ({msg})"),
        ),
        StoreError::Backend(msg) => internal(msg),
    }
}

/// Malformed or unexpected request bodies, including unknown fields.
pub fn json_rejection(rejection: JsonRejection) -> Response {
    validation(rejection.body_text())
}
