use serde::Serialize;
use thiserror::Error;

use intelplat_core::Role;

use crate::{Resource, RoleSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' does not satisfy {required}")]
    Forbidden { role: Role, required: RoleSet },
}

/// Whether `role` satisfies a requirement of "any of `required`".
///
/// Admin is a superset of every role.
pub fn satisfies(role: Role, required: &RoleSet) -> bool {
    match role {
        Role::Admin => true,
        Role::Cybersecurity | Role::DataScience | Role::ITOperations => required.contains(role),
    }
}

/// Authorize a role against a requirement.
///
/// - No IO
/// - No panics
/// - Session validity is checked by the caller (`SessionManager::authorize`)
pub fn authorize(role: Role, required: &RoleSet) -> Result<(), AuthzError> {
    if satisfies(role, required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role,
            required: *required,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Auditable explanation of an access decision for one resource.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub resource: Resource,
    pub title: &'static str,
    pub granted: bool,
    pub reason: String,
    pub allowed_roles: RoleSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    AdminOverride,
    RoleListed,
}

pub fn explain_authorization(role: Role, resource: Resource) -> AuthorizationExplanation {
    let allowed_roles = resource.allowed_roles();
    let grant = match role {
        Role::Admin => Some(GrantKind::AdminOverride),
        Role::Cybersecurity | Role::DataScience | Role::ITOperations => allowed_roles
            .contains(role)
            .then_some(GrantKind::RoleListed),
    };

    let reason = match grant {
        Some(GrantKind::AdminOverride) => "admin role satisfies every requirement".to_string(),
        Some(GrantKind::RoleListed) => format!("role '{role}' is allowed for '{resource}'"),
        None => format!("'{resource}' requires one of {allowed_roles}; session role is '{role}'"),
    };

    AuthorizationExplanation {
        resource,
        title: resource.title(),
        granted: grant.is_some(),
        reason,
        allowed_roles,
    }
}
