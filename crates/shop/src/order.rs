use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fitshop_core::{Entity, OrderId, Owned, UserId};

/// A placed order. Read-only here; visible to its owner and to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub owner_id: UserId,
    /// Total charged, in cents.
    pub total: i64,
    /// Payment processor charge reference.
    pub charge: String,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of an item at the time the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub title: String,
    pub price: i64,
    pub quantity: u32,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

impl Owned for Order {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}
