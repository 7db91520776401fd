//! Default accounts provisioned on first start.

use tracing::info;

use intelplat_core::{Role, Secret};

use crate::credentials::{CredentialError, CredentialStore};

#[derive(Debug, Clone, Copy)]
pub struct DefaultUser {
    pub username: &'static str,
    pub password: &'static str,
    pub role: Role,
}

/// One account per role.
pub const DEFAULT_USERS: [DefaultUser; 4] = [
    DefaultUser { username: "admin", password: "admin123", role: Role::Admin },
    DefaultUser { username: "cyber", password: "cyber123", role: Role::Cybersecurity },
    DefaultUser { username: "data", password: "data123", role: Role::DataScience },
    DefaultUser { username: "it", password: "it123", role: Role::ITOperations },
];

/// Create `users`, skipping usernames that already exist.
///
/// Returns the number of accounts actually created.
pub fn seed_users(store: &dyn CredentialStore, users: &[DefaultUser]) -> Result<usize, CredentialError> {
    let mut created = 0;
    for user in users {
        match store.create(user.username, &Secret::from(user.password), user.role) {
            Ok(_) => created += 1,
            Err(CredentialError::DuplicateUsername(_)) => {}
            Err(e) => return Err(e),
        }
    }
    info!(created, skipped = users.len() - created, "seeded users");
    Ok(created)
}

pub fn seed_default_users(store: &dyn CredentialStore) -> Result<usize, CredentialError> {
    seed_users(store, &DEFAULT_USERS)
}
