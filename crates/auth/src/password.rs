//! Salted, deliberately slow password hashing (Argon2id, PHC strings).

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashCost {
    /// Minimum legal parameters. Only for tests and fixtures.
    pub const fn insecure_fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hash cost: {0}")]
    InvalidCost(String),

    #[error("os random source failed: {0}")]
    Rng(String),

    #[error("hashing failed: {0}")]
    Hash(String),
}

/// Password hasher with a fixed cost and a per-instance dummy hash.
///
/// The dummy hash lets callers spend one full verification on lookups for
/// usernames that do not exist, so both failure paths cost the same.
pub struct CredentialHasher {
    argon: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialHasher {
    pub fn new(cost: HashCost) -> Result<Self, HashError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| HashError::InvalidCost(e.to_string()))?;
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut hasher = Self {
            argon,
            dummy_hash: String::new(),
        };
        let mut filler = [0u8; 24];
        getrandom::getrandom(&mut filler).map_err(|e| HashError::Rng(e.to_string()))?;
        let filler: String = filler.iter().map(|b| format!("{b:02x}")).collect();
        hasher.dummy_hash = hasher.hash(&filler)?;
        Ok(hasher)
    }

    /// Hash a plaintext with a fresh 16-byte random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| HashError::Rng(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Hash(e.to_string()))?;
        let phc = self
            .argon
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Verify a plaintext against a stored PHC string.
    ///
    /// Output comparison is constant time; a malformed hash verifies as false.
    pub fn verify(&self, phc: &str, plaintext: &str) -> bool {
        match PasswordHash::new(phc) {
            Ok(parsed) => self
                .argon
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Spend one verification against the dummy hash. Always false.
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let _ = self.verify(&self.dummy_hash, plaintext);
        false
    }
}

impl core::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(HashCost::insecure_fast()).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let phc = h.hash("admin123").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(h.verify(&phc, "admin123"));
        assert!(!h.verify(&phc, "admin124"));
    }

    #[test]
    fn salts_differ_per_hash() {
        let h = hasher();
        assert_ne!(h.hash("same").unwrap(), h.hash("same").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!hasher().verify("not-a-phc-string", "anything"));
    }

    #[test]
    fn rejects_illegal_cost() {
        let err = CredentialHasher::new(HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(matches!(err, HashError::InvalidCost(_)));
    }
}
