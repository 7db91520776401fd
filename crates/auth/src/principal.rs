use chrono::{DateTime, Utc};
use serde::Serialize;

use intelplat_core::Role;

use crate::SessionId;

/// Authenticated identity resolved from a live session.
///
/// Returned by a successful authorization so callers never re-read session
/// state they have not been granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    #[serde(skip)]
    pub session_id: SessionId,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}
