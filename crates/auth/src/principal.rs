use fitshop_core::UserId;

use crate::{Permission, PermissionSet, has_permission};

/// A fully resolved principal for authorization decisions.
///
/// Built from the verified credential's user id plus the permission set
/// currently stored for that user, so permission changes apply on the next
/// request without re-issuing credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: UserId,
    permissions: PermissionSet,
}

impl Principal {
    pub fn new(id: UserId, permissions: PermissionSet) -> Self {
        Self { id, permissions }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn has_any(&self, required: &[Permission]) -> bool {
        has_permission(&self.permissions, required)
    }
}
