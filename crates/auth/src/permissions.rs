use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Capability granted to a principal.
///
/// Serialized in upper case without separators (`ITEMDELETE`), which is also
/// the form stored in the database and accepted over the API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Admin,
    User,
    ItemCreate,
    ItemUpdate,
    ItemDelete,
    PermissionUpdate,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::Admin,
        Permission::User,
        Permission::ItemCreate,
        Permission::ItemUpdate,
        Permission::ItemDelete,
        Permission::PermissionUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Admin => "ADMIN",
            Permission::User => "USER",
            Permission::ItemCreate => "ITEMCREATE",
            Permission::ItemUpdate => "ITEMUPDATE",
            Permission::ItemDelete => "ITEMDELETE",
            Permission::PermissionUpdate => "PERMISSIONUPDATE",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl core::str::FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Set of permissions held by a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permission set granted at signup.
    pub fn signup_default() -> Self {
        [Permission::User].into_iter().collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Permission evaluator.
///
/// True iff `held` and `required` share at least one permission (OR semantics).
/// An empty `required` therefore never grants access.
pub fn has_permission(held: &PermissionSet, required: &[Permission]) -> bool {
    required.iter().any(|p| held.contains(*p))
}
