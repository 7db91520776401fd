use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use intelplat_auth::{Resource, explain_authorization, resources_for};

use crate::app::{AppState, dto, errors};
use crate::context::PrincipalContext;

/// Dashboards the caller may open (navigation).
pub async fn list_dashboards(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    let views: Vec<dto::ResourceView> = resources_for(principal.role())
        .into_iter()
        .map(dto::ResourceView::from)
        .collect();
    Json(views)
}

pub async fn open_dashboard(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<PrincipalContext>,
    Path(resource): Path<String>,
) -> axum::response::Response {
    let resource: Resource = match resource.parse() {
        Ok(r) => r,
        Err(e) => return errors::json_error(StatusCode::NOT_FOUND, "unknown_resource", format!("{e}")),
    };

    if let Err(e) = state.sessions.authorize(principal.session_id(), resource) {
        return errors::auth_error_to_response(e);
    }

    Json(explain_authorization(principal.role(), resource)).into_response()
}
