//! Storefront API: identity, authorization and the mutations built on them.
//!
//! Request flow: [`middleware`] resolves an [`context::Identity`], a handler
//! in [`app::routes`] builds a [`context::RequestContext`] and calls an
//! operation in [`operations`], which authorizes through [`authz`] and runs
//! [`accounts`] or [`cart`] logic against the store.

pub mod accounts;
pub mod app;
pub mod authz;
pub mod cart;
pub mod config;
pub mod context;
pub mod emails;
pub mod error;
pub mod middleware;
pub mod operations;

pub use error::{ApiError, ApiResult};
