//! Cart reconciliation.
//!
//! Adding an item the caller already has bumps the existing line instead of
//! creating a second one. Both the bump and the first insert are conditional
//! at the store, and a lost race just means reading the line again.

use fitshop_auth::{Principal, authorize_remove_cart_item};
use fitshop_core::{CartItemId, ItemId, UserId};
use fitshop_infra::{Store, StoreError};
use fitshop_shop::CartItem;

use crate::authz;
use crate::error::{ApiError, ApiResult};

/// Upper bound on optimistic retries for one (user, item) pair.
const MAX_ATTEMPTS: usize = 16;

pub async fn add_to_cart(store: &dyn Store, owner: UserId, item_id: ItemId) -> ApiResult<CartItem> {
    if store.item(item_id).await?.is_none() {
        return Err(ApiError::NotFound("item"));
    }

    for attempt in 1..=MAX_ATTEMPTS {
        let outcome = match store.cart_item_for(owner, item_id).await? {
            Some(line) => store.increment_cart_item(line.id, line.quantity).await,
            None => store.insert_cart_item(CartItem::new(owner, item_id)).await.map(Some),
        };

        match outcome {
            Ok(Some(line)) => return Ok(line),
            // Line vanished between read and bump: start over.
            Ok(None) => {}
            Err(StoreError::Conflict(reason)) => {
                tracing::debug!(attempt, %reason, "cart update raced, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::error!(user_id = %owner, item_id = %item_id, "cart update kept conflicting");
    Err(ApiError::StoreUnavailable(
        "cart line is being modified concurrently".to_string(),
    ))
}

/// Remove the whole line, whatever its quantity. Only the owner may do this.
pub async fn remove_from_cart(
    store: &dyn Store,
    principal: &Principal,
    id: CartItemId,
) -> ApiResult<CartItem> {
    let line = store.cart_item(id).await?.ok_or(ApiError::NotFound("cart item"))?;
    authz::enforce(principal, authorize_remove_cart_item(principal, &line))?;
    store
        .delete_cart_item(id)
        .await?
        .ok_or(ApiError::NotFound("cart item"))
}
