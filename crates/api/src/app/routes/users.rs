use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{get, put},
    Json, Router,
};

use fitshop_core::UserId;

use crate::app::dto;
use crate::app::routes::common::{ApiJson, parse_id};
use crate::app::services::AppServices;
use crate::context::Identity;
use crate::error::ApiError;
use crate::operations;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id/permissions", put(update_permissions))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<dto::UserView>>, ApiError> {
    let users = operations::users(&services.context(&identity)).await?;
    Ok(Json(users.iter().map(dto::UserView::from).collect()))
}

pub async fn update_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdatePermissionsRequest>,
) -> Result<Json<dto::UserView>, ApiError> {
    let id: UserId = parse_id(&id)?;
    let user =
        operations::update_permissions(&services.context(&identity), id, body.permissions).await?;
    Ok(Json(dto::UserView::from(&user)))
}
