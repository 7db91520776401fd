use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;

use intelplat_auth::{AuthError, Role, SessionId};

use crate::app::{AppState, dto, errors};
use crate::context::PrincipalContext;

pub async fn login(
    Extension(state): Extension<AppState>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let sessions = state.sessions.clone();
    // Argon2 verification is CPU-bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || sessions.login(&body.username, &body.password)).await;

    match result {
        Ok(Ok(session)) => Json(dto::SessionResponse::from(session)).into_response(),
        Ok(Err(e)) => errors::auth_error_to_response(e),
        Err(e) => errors::join_error(e),
    }
}

/// Self-service registration. Creating an Admin account needs an Admin session.
pub async fn register(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    if let Some(confirm) = &body.confirm_password {
        if confirm != &body.password {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", "passwords do not match");
        }
    }

    if body.role == Role::Admin {
        let token = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .unwrap_or_default();
        if let Err(e) = state.sessions.authorize(&SessionId::from_token(token), Role::Admin) {
            return errors::auth_error_to_response(e);
        }
    }

    let sessions = state.sessions.clone();
    let result =
        tokio::task::spawn_blocking(move || sessions.register(&body.username, &body.password, body.role)).await;

    match result {
        Ok(Ok(record)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "username": record.username,
                "role": record.role,
            })),
        )
            .into_response(),
        Ok(Err(e)) => errors::auth_error_to_response(e),
        Err(e) => errors::join_error(e),
    }
}

pub async fn logout(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<PrincipalContext>,
) -> StatusCode {
    if state.sessions.logout(principal.session_id()) {
        info!(username = principal.username(), "logged out");
    }
    StatusCode::NO_CONTENT
}

/// Rotate the caller's password. Every session of the caller, this one
/// included, is revoked.
pub async fn change_password(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> axum::response::Response {
    let sessions = state.sessions.clone();
    let username = principal.username().to_string();
    let result = tokio::task::spawn_blocking(move || {
        let store = sessions.credentials();
        let record = store
            .find_by_username(&username)
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !store.verify_password(&record, &body.current_password) {
            return Err(AuthError::InvalidCredentials);
        }
        sessions.rotate_password(&username, &body.new_password)
    })
    .await;

    match result {
        Ok(Ok(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => errors::auth_error_to_response(e),
        Err(e) => errors::join_error(e),
    }
}
