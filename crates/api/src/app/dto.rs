use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use intelplat_ai::DashboardContext;
use intelplat_auth::{Resource, Session};
use intelplat_core::{Role, Secret};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: Secret<String>,
    #[serde(default)]
    pub confirm_password: Option<Secret<String>>,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Secret<String>,
    pub new_password: Secret<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
    /// Free-form structured context.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    /// Rows from one dashboard; takes precedence over `context`.
    #[serde(default)]
    pub dashboard: Option<DashboardContext>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            token: s.id.as_str().to_string(),
            username: s.username,
            role: s.role,
            expires_at: s.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceView {
    pub resource: Resource,
    pub title: &'static str,
}

impl From<Resource> for ResourceView {
    fn from(resource: Resource) -> Self {
        Self {
            resource,
            title: resource.title(),
        }
    }
}
