use axum::{
    Router,
    routing::{get, post, put},
};

pub mod ai;
pub mod auth;
pub mod dashboards;
pub mod system;
pub mod users;

/// Routes reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password", post(auth::change_password))
        .route("/dashboards", get(dashboards::list_dashboards))
        .route("/dashboards/:resource", get(dashboards::open_dashboard))
        .route("/ai/status", get(ai::status))
        .route("/ai/questions", get(ai::questions))
        .route("/ai/ask", post(ai::ask))
        .route("/ai/analyse", post(ai::analyse))
        .route("/admin/users", get(users::list_users))
        .route("/admin/users/:username/role", put(users::change_role))
}
