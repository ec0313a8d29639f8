//! Transactional store contract.
//!
//! Every method is a single atomic unit against the backing store. The
//! read-modify-write sequences that must not interleave (reset redemption,
//! cart quantity bumps) are exposed as conditional primitives so callers never
//! need cross-request locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use fitshop_auth::{PermissionSet, ResetTicket, User};
use fitshop_core::{CartItemId, Email, ItemId, OrderId, UserId};
use fitshop_shop::{CartItem, Item, ItemChanges, Order};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint or a conditional update did not hold.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Offset pagination for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub first: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    /// Build a page, clamping the size into `1..=MAX_SIZE`.
    pub fn new(skip: Option<u32>, first: Option<u32>) -> Self {
        Self {
            skip: skip.unwrap_or(0),
            first: first.unwrap_or(Self::DEFAULT_SIZE).clamp(1, Self::MAX_SIZE),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── users ────────────────────────────────────────────────────────────

    /// Persist a new user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Replace the user's reset ticket. `None` if the user does not exist.
    async fn set_reset_ticket(
        &self,
        id: UserId,
        ticket: ResetTicket,
    ) -> Result<Option<User>, StoreError>;

    /// Redeem a reset ticket in one atomic step.
    ///
    /// Finds the user whose ticket matches `token` and is still usable at
    /// `now`, stores `password_hash` and clears the ticket. At most one caller
    /// can redeem a given token; everyone else gets `None`.
    async fn redeem_reset_ticket(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Replace (not merge) the user's permission set.
    async fn replace_permissions(
        &self,
        id: UserId,
        permissions: PermissionSet,
    ) -> Result<Option<User>, StoreError>;

    // ── items ────────────────────────────────────────────────────────────

    async fn insert_item(&self, item: Item) -> Result<Item, StoreError>;

    async fn item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Items newest first.
    async fn list_items(&self, page: Page) -> Result<Vec<Item>, StoreError>;

    async fn count_items(&self) -> Result<u64, StoreError>;

    async fn update_item(
        &self,
        id: ItemId,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, StoreError>;

    /// Delete an item together with every cart line pointing at it.
    async fn delete_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    // ── cart ─────────────────────────────────────────────────────────────

    async fn cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError>;

    async fn cart_item_for(
        &self,
        owner: UserId,
        item: ItemId,
    ) -> Result<Option<CartItem>, StoreError>;

    async fn cart_items(&self, owner: UserId) -> Result<Vec<CartItem>, StoreError>;

    /// Insert a new line. Fails with `Conflict` if the owner already has a
    /// line for the same item.
    async fn insert_cart_item(&self, line: CartItem) -> Result<CartItem, StoreError>;

    /// Compare-and-set increment.
    ///
    /// Sets the quantity to `expected_quantity + 1` only if it still equals
    /// `expected_quantity`. `Conflict` if it moved, `None` if the line is gone.
    async fn increment_cart_item(
        &self,
        id: CartItemId,
        expected_quantity: u32,
    ) -> Result<Option<CartItem>, StoreError>;

    async fn delete_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError>;

    // ── orders ───────────────────────────────────────────────────────────

    /// Orders are created by checkout, which lives outside this service; this
    /// is the seeding entry point.
    async fn insert_order(&self, order: Order) -> Result<Order, StoreError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// The owner's orders, newest first.
    async fn orders_for(&self, owner: UserId) -> Result<Vec<Order>, StoreError>;
}
