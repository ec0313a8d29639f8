use serde::{Deserialize, Serialize};

use fitshop_core::{CartItemId, Entity, ItemId, Owned, UserId};

/// One line of a user's cart.
///
/// At most one line exists per (owner, item) pair; adding the same item again
/// bumps `quantity` instead of creating a second line. `quantity` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub owner_id: UserId,
    pub item_id: ItemId,
    pub quantity: u32,
}

impl CartItem {
    /// A fresh line holding a single unit.
    pub fn new(owner_id: UserId, item_id: ItemId) -> Self {
        Self {
            id: CartItemId::new(),
            owner_id,
            item_id,
            quantity: 1,
        }
    }

    /// The same line with one more unit.
    pub fn incremented(&self) -> Self {
        Self {
            quantity: self.quantity.saturating_add(1),
            ..self.clone()
        }
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &CartItemId {
        &self.id
    }
}

impl Owned for CartItem {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}
