use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use intelplat_ai::AiError;
use intelplat_auth::AuthError;

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        AuthError::SessionExpired => json_error(StatusCode::UNAUTHORIZED, "session_expired", err.to_string()),
        AuthError::Forbidden { .. } => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        AuthError::DuplicateUsername(_) => json_error(StatusCode::CONFLICT, "duplicate_username", err.to_string()),
        AuthError::UnknownUser(_) => json_error(StatusCode::NOT_FOUND, "unknown_user", err.to_string()),
        AuthError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        AuthError::Store(_) | AuthError::TokenGeneration(_) => {
            tracing::error!(error = %err, "auth backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn ai_error_to_response(err: AiError) -> axum::response::Response {
    let status = match &err {
        AiError::NoKeyConfigured | AiError::NoModelAvailable => StatusCode::SERVICE_UNAVAILABLE,
        AiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        AiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        AiError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        AiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// A blocking task panicked or was cancelled.
pub fn join_error(err: tokio::task::JoinError) -> axum::response::Response {
    tracing::error!(error = %err, "blocking task failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}
