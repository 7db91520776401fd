use serde::{Serialize, Serializer};

use intelplat_core::Role;

/// Set of roles, used as the requirement side of an authorization check.
///
/// Requirements are expressed as "any of these roles"; a single required
/// role converts into a one-element set.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);
    pub const ALL: RoleSet = RoleSet(0b1111);

    pub const fn only(role: Role) -> Self {
        Self(bit(role))
    }

    pub fn of(roles: &[Role]) -> Self {
        roles.iter().copied().collect()
    }

    pub const fn with(self, role: Role) -> Self {
        Self(self.0 | bit(role))
    }

    pub const fn contains(&self, role: Role) -> bool {
        self.0 & bit(role) != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

const fn bit(role: Role) -> u8 {
    match role {
        Role::Admin => 0b0001,
        Role::Cybersecurity => 0b0010,
        Role::DataScience => 0b0100,
        Role::ITOperations => 0b1000,
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        RoleSet::only(role)
    }
}

impl From<&[Role]> for RoleSet {
    fn from(roles: &[Role]) -> Self {
        RoleSet::of(roles)
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::EMPTY, RoleSet::with)
    }
}

impl core::fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl core::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return f.write_str("<none>");
        }
        let mut first = true;
        for role in self.iter() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(role.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
