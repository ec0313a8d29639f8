use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use fitshop_core::ItemId;
use fitshop_infra::Page;
use fitshop_shop::{Item, ItemChanges, NewItem};

use crate::app::dto;
use crate::app::routes::common::{ApiJson, ApiQuery, parse_id};
use crate::app::services::AppServices;
use crate::context::Identity;
use crate::error::ApiError;
use crate::operations;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/count", get(count_items))
        .route("/:id", get(get_item).patch(update_item).delete(delete_item))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiQuery(query): ApiQuery<dto::ItemsQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let page = Page::new(query.skip, query.first);
    Ok(Json(operations::items(&services.context(&identity), page).await?))
}

pub async fn count_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<dto::CountResponse>, ApiError> {
    let count = operations::items_count(&services.context(&identity)).await?;
    Ok(Json(dto::CountResponse { count }))
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let id: ItemId = parse_id(&id)?;
    Ok(Json(operations::item(&services.context(&identity), id).await?))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<NewItem>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = operations::create_item(&services.context(&identity), body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ItemChanges>,
) -> Result<Json<Item>, ApiError> {
    let id: ItemId = parse_id(&id)?;
    Ok(Json(operations::update_item(&services.context(&identity), id, body).await?))
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let id: ItemId = parse_id(&id)?;
    Ok(Json(operations::delete_item(&services.context(&identity), id).await?))
}
