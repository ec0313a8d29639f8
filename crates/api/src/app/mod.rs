//! HTTP application wiring (axum router + shared services).
//!
//! - `services.rs`: store, mailer and account manager shared by handlers
//! - `routes/`: thin handlers over `crate::operations`, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: status codes and the JSON error body

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (used by `main.rs` and the black-box tests).
pub fn build_app(services: AppServices) -> Router {
    let identity_state = middleware::IdentityState {
        codec: services.accounts.codec().clone(),
    };

    routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            identity_state,
            middleware::identity_middleware,
        ))
        .layer(ServiceBuilder::new())
}
