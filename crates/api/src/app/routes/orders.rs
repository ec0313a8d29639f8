use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::get,
    Json, Router,
};

use fitshop_core::OrderId;
use fitshop_shop::Order;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::context::Identity;
use crate::error::ApiError;
use crate::operations;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(operations::orders(&services.context(&identity)).await?))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(operations::order(&services.context(&identity), id).await?))
}
