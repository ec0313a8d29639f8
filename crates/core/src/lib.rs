//! `fitshop-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model and the email value object. No IO.

pub mod email;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use email::Email;
pub use entity::{Entity, Owned};
pub use error::DomainError;
pub use id::{CartItemId, ItemId, OrderId, UserId};
pub use value_object::ValueObject;
