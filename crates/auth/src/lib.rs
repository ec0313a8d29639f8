//! `fitshop-auth`: identity and permission engine.
//!
//! Credential signing, permission evaluation, per-resource authorization rules,
//! password hashing and reset tickets. Decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod reset;
pub mod user;

pub use authorize::{
    AuthzError, authorize_delete_item, authorize_list_users, authorize_read_order,
    authorize_remove_cart_item, authorize_update_permissions,
};
pub use claims::{CredentialCodec, CredentialError, SessionClaims};
pub use password::{HashCost, PasswordError, hash_password, verify_password};
pub use permissions::{Permission, PermissionSet, has_permission};
pub use principal::Principal;
pub use reset::{RESET_TOKEN_TTL, ResetTicket};
pub use user::{NewUser, User};
