//! Per-resource authorization rules.
//!
//! Every rule is a pure check of a resolved [`Principal`] against the resource
//! it wants to touch. Callers run these before mutating anything, so a denial
//! never leaves partial state behind.
//!
//! | Operation            | Rule                                          |
//! |----------------------|-----------------------------------------------|
//! | delete item          | owner, or ADMIN / ITEMDELETE                  |
//! | remove cart item     | owner only                                    |
//! | update permissions   | ADMIN / PERMISSIONUPDATE                      |
//! | read single order    | owner, or ADMIN                               |
//! | list users           | ADMIN / PERMISSIONUPDATE                      |
//!
//! Item creation, item update and adding to the cart carry no rule here:
//! creation and cart additions only need an authenticated identity, and item
//! updates are open to any caller.

use thiserror::Error;

use fitshop_core::Owned;

use crate::{Permission, Principal};

pub const ITEM_DELETE_OVERRIDE: [Permission; 2] = [Permission::Admin, Permission::ItemDelete];
pub const PERMISSION_ADMIN: [Permission; 2] = [Permission::Admin, Permission::PermissionUpdate];
pub const ORDER_READ_OVERRIDE: [Permission; 1] = [Permission::Admin];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires one of [{}]", join(.0))]
    MissingPermission(Vec<Permission>),

    #[error("forbidden: not the owner of this {0}")]
    NotOwner(&'static str),

    #[error("forbidden: not the owner of this {resource} and lacks one of [{}]", join(.required))]
    NotOwnerNorPrivileged {
        resource: &'static str,
        required: Vec<Permission>,
    },
}

fn join(perms: &[Permission]) -> String {
    perms.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
}

fn require_any(principal: &Principal, required: &[Permission]) -> Result<(), AuthzError> {
    if principal.has_any(required) {
        Ok(())
    } else {
        Err(AuthzError::MissingPermission(required.to_vec()))
    }
}

fn require_owner_or_any<R: Owned>(
    principal: &Principal,
    resource: &R,
    kind: &'static str,
    required: &[Permission],
) -> Result<(), AuthzError> {
    if resource.owner_id() == principal.id() || principal.has_any(required) {
        Ok(())
    } else {
        Err(AuthzError::NotOwnerNorPrivileged {
            resource: kind,
            required: required.to_vec(),
        })
    }
}

pub fn authorize_delete_item<R: Owned>(principal: &Principal, item: &R) -> Result<(), AuthzError> {
    require_owner_or_any(principal, item, "item", &ITEM_DELETE_OVERRIDE)
}

pub fn authorize_remove_cart_item<R: Owned>(
    principal: &Principal,
    cart_item: &R,
) -> Result<(), AuthzError> {
    if cart_item.owner_id() == principal.id() {
        Ok(())
    } else {
        Err(AuthzError::NotOwner("cart item"))
    }
}

pub fn authorize_update_permissions(principal: &Principal) -> Result<(), AuthzError> {
    require_any(principal, &PERMISSION_ADMIN)
}

pub fn authorize_read_order<R: Owned>(principal: &Principal, order: &R) -> Result<(), AuthzError> {
    require_owner_or_any(principal, order, "order", &ORDER_READ_OVERRIDE)
}

pub fn authorize_list_users(principal: &Principal) -> Result<(), AuthzError> {
    require_any(principal, &PERMISSION_ADMIN)
}
