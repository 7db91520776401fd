use thiserror::Error;

use crate::credentials::CredentialError;
use crate::{AuthzError, RoleSet};
use intelplat_core::Role;

/// Errors surfaced by the session boundary.
///
/// `InvalidCredentials` deliberately carries no detail: callers cannot tell an
/// unknown username from a wrong password.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("session expired or not found")]
    SessionExpired,

    #[error("forbidden: role '{role}' does not satisfy {required}")]
    Forbidden { role: Role, required: RoleSet },

    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("credential store error: {0}")]
    Store(String),

    #[error("session token generation failed: {0}")]
    TokenGeneration(String),
}

impl From<AuthzError> for AuthError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden { role, required } => AuthError::Forbidden { role, required },
        }
    }
}

impl AuthError {
    pub(crate) fn from_store(err: CredentialError, username: &str) -> Self {
        match err {
            CredentialError::NotFound => AuthError::UnknownUser(username.to_string()),
            CredentialError::DuplicateUsername(name) => AuthError::DuplicateUsername(name),
            CredentialError::InvalidInput(msg) => AuthError::InvalidInput(msg),
            CredentialError::Hash(e) => AuthError::Store(e.to_string()),
            CredentialError::Backend(msg) => AuthError::Store(msg),
        }
    }
}
