//! User records and the credential store boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use intelplat_core::{Role, Secret, SharedClock, SystemClock};

use crate::password::{CredentialHasher, HashCost, HashError};

/// Persisted user account.
///
/// `password_hash` is an Argon2id PHC string; plaintext never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("user not found")]
    NotFound,

    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("backing store failure: {0}")]
    Backend(String),
}

/// Keyed store of user credentials.
///
/// Implementations must make `create` atomic: two concurrent creates of the
/// same username yield exactly one record and one `DuplicateUsername`.
pub trait CredentialStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<UserRecord, CredentialError>;

    /// Constant-time comparison of `plaintext` against `record`'s hash.
    fn verify_password(&self, record: &UserRecord, plaintext: &Secret<String>) -> bool;

    /// Spend the same work as `verify_password` for a username that was not
    /// found. Always returns false.
    fn verify_absent(&self, plaintext: &Secret<String>) -> bool;

    fn create(
        &self,
        username: &str,
        plaintext: &Secret<String>,
        role: Role,
    ) -> Result<UserRecord, CredentialError>;

    fn rotate_password(
        &self,
        username: &str,
        new_plaintext: &Secret<String>,
    ) -> Result<UserRecord, CredentialError>;

    fn update_role(&self, username: &str, role: Role) -> Result<UserRecord, CredentialError>;

    fn delete(&self, username: &str) -> Result<(), CredentialError>;

    fn list_usernames(&self) -> Vec<String>;
}

/// In-memory credential store keyed by username.
#[derive(Debug)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, UserRecord>>,
    hasher: CredentialHasher,
    clock: SharedClock,
}

impl InMemoryCredentialStore {
    pub fn new(cost: HashCost) -> Result<Self, CredentialError> {
        Self::with_clock(cost, SystemClock::shared())
    }

    pub fn with_clock(cost: HashCost, clock: SharedClock) -> Result<Self, CredentialError> {
        Ok(Self {
            users: RwLock::new(HashMap::new()),
            hasher: CredentialHasher::new(cost)?,
            clock,
        })
    }
}

fn validate_username(username: &str) -> Result<&str, CredentialError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::InvalidInput("username must not be empty".to_string()));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(CredentialError::InvalidInput(
            "username must not contain control characters".to_string(),
        ));
    }
    Ok(trimmed)
}

fn validate_password(plaintext: &Secret<String>) -> Result<(), CredentialError> {
    if plaintext.is_empty() {
        return Err(CredentialError::InvalidInput("password must not be empty".to_string()));
    }
    Ok(())
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_by_username(&self, username: &str) -> Result<UserRecord, CredentialError> {
        self.users
            .read()
            .get(username.trim())
            .cloned()
            .ok_or(CredentialError::NotFound)
    }

    fn verify_password(&self, record: &UserRecord, plaintext: &Secret<String>) -> bool {
        self.hasher.verify(&record.password_hash, plaintext.expose())
    }

    fn verify_absent(&self, plaintext: &Secret<String>) -> bool {
        self.hasher.verify_dummy(plaintext.expose())
    }

    fn create(
        &self,
        username: &str,
        plaintext: &Secret<String>,
        role: Role,
    ) -> Result<UserRecord, CredentialError> {
        let username = validate_username(username)?;
        validate_password(plaintext)?;

        // Hash before taking the write lock; Argon2 is slow on purpose.
        let password_hash = self.hasher.hash(plaintext.expose())?;

        let mut users = self.users.write();
        if users.contains_key(username) {
            return Err(CredentialError::DuplicateUsername(username.to_string()));
        }
        let record = UserRecord {
            username: username.to_string(),
            password_hash,
            role,
            created_at: self.clock.now(),
        };
        users.insert(record.username.clone(), record.clone());
        info!(username = %record.username, role = %role, "credential created");
        Ok(record)
    }

    fn rotate_password(
        &self,
        username: &str,
        new_plaintext: &Secret<String>,
    ) -> Result<UserRecord, CredentialError> {
        validate_password(new_plaintext)?;
        let password_hash = self.hasher.hash(new_plaintext.expose())?;

        let mut users = self.users.write();
        let record = users
            .get_mut(username.trim())
            .ok_or(CredentialError::NotFound)?;
        record.password_hash = password_hash;
        info!(username = %record.username, "password rotated");
        Ok(record.clone())
    }

    fn update_role(&self, username: &str, role: Role) -> Result<UserRecord, CredentialError> {
        let mut users = self.users.write();
        let record = users
            .get_mut(username.trim())
            .ok_or(CredentialError::NotFound)?;
        let previous = record.role;
        record.role = role;
        info!(username = %record.username, from = %previous, to = %role, "role updated");
        Ok(record.clone())
    }

    fn delete(&self, username: &str) -> Result<(), CredentialError> {
        match self.users.write().remove(username.trim()) {
            Some(_) => {
                info!(username = %username.trim(), "credential deleted");
                Ok(())
            }
            None => Err(CredentialError::NotFound),
        }
    }

    fn list_usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users.read().keys().cloned().collect();
        names.sort();
        debug!(count = names.len(), "listed usernames");
        names
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn store() -> InMemoryCredentialStore {
        InMemoryCredentialStore::new(HashCost::insecure_fast()).unwrap()
    }

    fn pw(s: &str) -> Secret<String> {
        Secret::from(s)
    }

    #[test]
    fn create_and_find() {
        let s = store();
        let rec = s.create("alice", &pw("s3cret"), Role::DataScience).unwrap();
        assert_eq!(rec.role, Role::DataScience);
        assert_ne!(rec.password_hash, "s3cret");

        let found = s.find_by_username("alice").unwrap();
        assert_eq!(found, rec);
        assert!(s.verify_password(&found, &pw("s3cret")));
        assert!(!s.verify_password(&found, &pw("S3cret")));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let s = store();
        s.create("bob", &pw("one"), Role::Cybersecurity).unwrap();
        let err = s.create("bob", &pw("two"), Role::Admin).unwrap_err();
        assert_eq!(err, CredentialError::DuplicateUsername("bob".to_string()));
        assert_eq!(s.find_by_username("bob").unwrap().role, Role::Cybersecurity);
    }

    #[test]
    fn concurrent_creates_of_same_name_yield_one_record() {
        let s = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = s.clone();
                std::thread::spawn(move || s.create("race", &Secret::from("pw"), Role::ITOperations).is_ok())
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(created, 1);
        assert_eq!(s.list_usernames(), vec!["race".to_string()]);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let s = store();
        assert!(matches!(
            s.create("  ", &pw("x"), Role::Admin),
            Err(CredentialError::InvalidInput(_))
        ));
        assert!(matches!(
            s.create("carol", &pw(""), Role::Admin),
            Err(CredentialError::InvalidInput(_))
        ));
    }

    #[test]
    fn rotation_replaces_hash() {
        let s = store();
        s.create("dave", &pw("old"), Role::DataScience).unwrap();
        let rotated = s.rotate_password("dave", &pw("new")).unwrap();
        assert!(s.verify_password(&rotated, &pw("new")));
        assert!(!s.verify_password(&rotated, &pw("old")));
    }

    #[test]
    fn delete_and_missing_user() {
        let s = store();
        s.create("erin", &pw("pw"), Role::Cybersecurity).unwrap();
        s.delete("erin").unwrap();
        assert_eq!(s.find_by_username("erin"), Err(CredentialError::NotFound));
        assert_eq!(s.delete("erin"), Err(CredentialError::NotFound));
        assert_eq!(
            s.update_role("erin", Role::Admin),
            Err(CredentialError::NotFound)
        );
    }

    #[test]
    fn absent_verification_is_always_false() {
        assert!(!store().verify_absent(&pw("anything")));
    }
}
