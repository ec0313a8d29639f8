//! Shop domain: catalog items, cart lines and orders.
//!
//! Plain entities with input validation. No IO, no HTTP, no storage.

pub mod cart;
pub mod item;
pub mod order;

pub use cart::CartItem;
pub use item::{Item, ItemChanges, NewItem};
pub use order::{Order, OrderLine};
