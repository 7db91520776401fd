use axum::{
    Json,
    extract::Extension,
    response::IntoResponse,
};

use intelplat_ai::{DashboardContext, suggested_questions};
use intelplat_auth::Resource;
use intelplat_core::Role;

use crate::app::{AppState, dto, errors};
use crate::context::PrincipalContext;

/// Dashboard whose rows a context carries.
fn resource_for(context: &DashboardContext) -> Resource {
    match context.owner() {
        Role::Cybersecurity => Resource::Cybersecurity,
        Role::DataScience => Resource::DataScience,
        Role::ITOperations => Resource::ItOperations,
        Role::Admin => Resource::Executive,
    }
}

pub async fn status(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let models = state
        .gateway
        .discovery()
        .map(|cache| cache.snapshot())
        .unwrap_or_default();
    Json(serde_json::json!({
        "status": state.gateway.status(),
        "models": models,
    }))
}

pub async fn questions(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(suggested_questions(principal.role()))
}

pub async fn ask(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::AskRequest>,
) -> axum::response::Response {
    if let Err(e) = state.sessions.authorize(principal.session_id(), Resource::AiAssistant) {
        return errors::auth_error_to_response(e);
    }

    let result = match &body.dashboard {
        Some(dashboard) => {
            if let Err(e) = state.sessions.authorize(principal.session_id(), resource_for(dashboard)) {
                return errors::auth_error_to_response(e);
            }
            state
                .gateway
                .ask_with_dashboard(principal.role(), &body.prompt, dashboard)
                .await
        }
        None => {
            state
                .gateway
                .ask(principal.role(), &body.prompt, body.context.as_ref())
                .await
        }
    };

    match result {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => errors::ai_error_to_response(e),
    }
}

pub async fn analyse(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<PrincipalContext>,
    Json(context): Json<DashboardContext>,
) -> axum::response::Response {
    if let Err(e) = state.sessions.authorize(principal.session_id(), resource_for(&context)) {
        return errors::auth_error_to_response(e);
    }

    match state.gateway.analyse(principal.role(), &context).await {
        Ok(insight) => Json(insight).into_response(),
        Err(e) => errors::ai_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_map_to_their_dashboards() {
        assert_eq!(resource_for(&DashboardContext::Incidents(vec![])), Resource::Cybersecurity);
        assert_eq!(resource_for(&DashboardContext::Datasets(vec![])), Resource::DataScience);
        assert_eq!(resource_for(&DashboardContext::Tickets(vec![])), Resource::ItOperations);
    }
}
