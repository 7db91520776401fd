use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use intelplat_auth::{SessionId, SessionManager};

use crate::app::errors;
use crate::context::{PrincipalContext, RequestId};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tag every request with a fresh id, echo it back and log within its span.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    req.extensions_mut().insert(request_id);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut resp = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| tracing::debug!(status = resp.status().as_u16(), "request finished"));

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}

/// Resolve the bearer token to a live session.
///
/// Any role may pass here; routes narrow the requirement further. The session
/// expiry slides once the route has answered, unless it answered 403.
pub async fn auth_middleware(
    State(sessions): State<Arc<SessionManager>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "missing bearer token",
        );
    };

    let id = SessionId::from_token(token);
    let principal = match sessions.validate(&id) {
        Ok(p) => p,
        Err(e) => return errors::auth_error_to_response(e),
    };

    req.extensions_mut().insert(PrincipalContext::new(principal));
    let resp = next.run(req).await;

    if resp.status() != StatusCode::FORBIDDEN {
        // Fails harmlessly when the route logged the session out.
        let _ = sessions.touch(&id);
    }
    resp
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
