//! User (principal) record.

use chrono::{DateTime, Utc};

use fitshop_core::{DomainError, Email, Entity, UserId};

use crate::{PermissionSet, Principal, ResetTicket};

/// A stored principal.
///
/// Deliberately not `Serialize`: the password hash and reset ticket must never
/// leave the server. API layers map this to their own view type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub password_hash: String,
    pub permissions: PermissionSet,
    pub reset: Option<ResetTicket>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.permissions.clone())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

/// Validated signup data, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(email: Email, name: &str, password_hash: String) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            email,
            name: name.to_string(),
            password_hash,
        })
    }

    /// Materialize the record with the signup permission set.
    pub fn into_user(self, created_at: DateTime<Utc>) -> User {
        User {
            id: UserId::new(),
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            permissions: PermissionSet::signup_default(),
            reset: None,
            created_at,
        }
    }
}
