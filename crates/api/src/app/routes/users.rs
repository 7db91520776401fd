use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};

use intelplat_auth::Role;

use crate::app::{AppState, dto, errors};
use crate::context::PrincipalContext;

pub async fn list_users(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = state.sessions.authorize(principal.session_id(), Role::Admin) {
        return errors::auth_error_to_response(e);
    }
    Json(state.sessions.credentials().list_usernames()).into_response()
}

/// Change a user's role; their open sessions are revoked.
pub async fn change_role(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<PrincipalContext>,
    Path(username): Path<String>,
    Json(body): Json<dto::ChangeRoleRequest>,
) -> axum::response::Response {
    if let Err(e) = state.sessions.authorize(principal.session_id(), Role::Admin) {
        return errors::auth_error_to_response(e);
    }
    match state.sessions.change_role(&username, body.role) {
        Ok(record) => Json(serde_json::json!({
            "username": record.username,
            "role": record.role,
        }))
        .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
