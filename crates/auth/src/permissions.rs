use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use intelplat_core::Role;

use crate::RoleSet;

/// Role-scoped resource (dashboard or feature area).
///
/// Each resource carries its allowed-role set; an authorization check for a
/// resource is a check against that set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Executive,
    Cybersecurity,
    DataScience,
    ItOperations,
    AiAssistant,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Executive,
        Resource::Cybersecurity,
        Resource::DataScience,
        Resource::ItOperations,
        Resource::AiAssistant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Executive => "executive",
            Resource::Cybersecurity => "cybersecurity",
            Resource::DataScience => "data_science",
            Resource::ItOperations => "it_operations",
            Resource::AiAssistant => "ai_assistant",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Resource::Executive => "Executive Dashboard",
            Resource::Cybersecurity => "Cybersecurity",
            Resource::DataScience => "Data Science",
            Resource::ItOperations => "IT Operations",
            Resource::AiAssistant => "AI Assistant",
        }
    }

    /// Roles allowed to open this resource. Admin is always included.
    pub const fn allowed_roles(&self) -> RoleSet {
        match self {
            Resource::Executive | Resource::AiAssistant => RoleSet::ALL,
            Resource::Cybersecurity => RoleSet::only(Role::Admin).with(Role::Cybersecurity),
            Resource::DataScience => RoleSet::only(Role::Admin).with(Role::DataScience),
            Resource::ItOperations => RoleSet::only(Role::Admin).with(Role::ITOperations),
        }
    }
}

impl From<Resource> for RoleSet {
    fn from(resource: Resource) -> Self {
        resource.allowed_roles()
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown resource '{0}'")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

/// Resources a role may open, in navigation order.
pub fn resources_for(role: Role) -> Vec<Resource> {
    Resource::ALL
        .into_iter()
        .filter(|r| crate::authorize::satisfies(role, &r.allowed_roles()))
        .collect()
}
