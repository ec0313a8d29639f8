use axum::{routing::get, Router};

pub mod auth;
pub mod cart;
pub mod common;
pub mod items;
pub mod orders;
pub mod system;
pub mod users;

/// Every route runs behind the identity middleware; anonymous requests reach
/// the handlers and fail there if the operation needs a caller.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .merge(auth::router())
        .nest("/items", items::router())
        .nest("/users", users::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
}
