//! Closed role enumeration shared by the auth and AI boundaries.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role granted to a user account.
///
/// Roles form a closed set: adding one is a code change, and every place that
/// reasons about roles does so with an exhaustive `match`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator; satisfies every role requirement.
    Admin,
    Cybersecurity,
    DataScience,
    #[serde(rename = "it_operations")]
    ITOperations,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::Cybersecurity,
        Role::DataScience,
        Role::ITOperations,
    ];

    /// Stable wire/storage name (`snake_case`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cybersecurity => "cybersecurity",
            Role::DataScience => "data_science",
            Role::ITOperations => "it_operations",
        }
    }

    /// Human-readable label for navigation and prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Cybersecurity => "Cybersecurity",
            Role::DataScience => "Data Science",
            Role::ITOperations => "IT Operations",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "cybersecurity" => Ok(Role::Cybersecurity),
            "data_science" => Ok(Role::DataScience),
            "it_operations" => Ok(Role::ITOperations),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
