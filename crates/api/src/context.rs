use uuid::Uuid;

use intelplat_auth::{Principal, SessionId};

/// Correlation id for one HTTP request (UUIDv7, time-ordered).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Authenticated caller for a request.
///
/// Present on every protected route; built by the auth middleware from a
/// successful `authorize` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn session_id(&self) -> &SessionId {
        &self.principal.session_id
    }

    pub fn role(&self) -> intelplat_core::Role {
        self.principal.role
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }
}
