//! HTTP API application wiring (Axum router + state).
//!
//! - `services.rs`: builds the session manager and AI gateway from config
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use intelplat_ai::AiGateway;
use intelplat_auth::SessionManager;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Shared per-process state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub gateway: Arc<AiGateway>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, gateway: Arc<AiGateway>) -> Self {
        Self { sessions, gateway }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    // Protected routes: require a live session.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        state.sessions.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_id_middleware))
                .layer(Extension(state)),
        )
}
