use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{delete, get, post},
    Json, Router,
};

use fitshop_core::CartItemId;
use fitshop_shop::CartItem;

use crate::app::dto;
use crate::app::routes::common::{ApiJson, parse_id};
use crate::app::services::AppServices;
use crate::context::Identity;
use crate::error::ApiError;
use crate::operations;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_to_cart))
        .route("/items/:id", delete(remove_from_cart))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<CartItem>>, ApiError> {
    Ok(Json(operations::cart(&services.context(&identity)).await?))
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<dto::AddToCartRequest>,
) -> Result<Json<CartItem>, ApiError> {
    let ctx = services.context(&identity);
    Ok(Json(operations::add_to_cart(&ctx, body.item_id).await?))
}

pub async fn remove_from_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<CartItem>, ApiError> {
    let id: CartItemId = parse_id(&id)?;
    Ok(Json(operations::remove_from_cart(&services.context(&identity), id).await?))
}
