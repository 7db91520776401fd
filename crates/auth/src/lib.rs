//! `intelplat-auth` — credential verification and role-scoped sessions.
//!
//! This crate is intentionally decoupled from HTTP and from any particular
//! persistent store; `CredentialStore` is the storage seam.

pub mod authorize;
pub mod credentials;
pub mod error;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod seed;
pub mod session;

pub use authorize::{AuthorizationExplanation, AuthzError, authorize, explain_authorization, satisfies};
pub use credentials::{CredentialError, CredentialStore, InMemoryCredentialStore, UserRecord};
pub use error::AuthError;
pub use intelplat_core::Role;
pub use password::{CredentialHasher, HashCost, HashError};
pub use permissions::{Resource, UnknownResource, resources_for};
pub use principal::Principal;
pub use roles::RoleSet;
pub use seed::{DEFAULT_USERS, DefaultUser, seed_default_users, seed_users};
pub use session::{Session, SessionConfig, SessionId, SessionManager, SessionState};
