use std::sync::Arc;

use axum::{
    extract::Extension,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::accounts::Session;
use crate::app::dto;
use crate::app::routes::common::ApiJson;
use crate::app::services::AppServices;
use crate::context::Identity;
use crate::error::ApiError;
use crate::middleware::{clear_session_cookie, session_cookie};
use crate::operations;

pub fn router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/request-reset", post(request_reset))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
}

/// The principal in the body, the credential in an HTTP-only cookie.
fn session_response(session: Session, secure: bool) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(&session.credential, secure))],
        Json(dto::UserView::from(&session.user)),
    )
        .into_response()
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<dto::SignupRequest>,
) -> Result<Response, ApiError> {
    let ctx = services.context(&identity);
    let session =
        operations::signup(&ctx, &services.accounts, &body.email, &body.password, &body.name)
            .await?;
    Ok(session_response(session, services.cookie_secure))
}

pub async fn signin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<dto::SigninRequest>,
) -> Response {
    let ctx = services.context(&identity);
    match operations::signin(&ctx, &services.accounts, &body.email, &body.password).await {
        Ok(session) => session_response(session, services.cookie_secure),
        Err(err) => err.into_signin_response(),
    }
}

pub async fn signout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let message = operations::signout(&services.context(&identity));
    (
        [(header::SET_COOKIE, clear_session_cookie(services.cookie_secure))],
        Json(dto::MessageResponse { message }),
    )
        .into_response()
}

pub async fn request_reset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<dto::RequestResetRequest>,
) -> Result<Json<dto::MessageResponse>, ApiError> {
    let ctx = services.context(&identity);
    let message = operations::request_reset(&ctx, &services.accounts, &body.email).await?;
    Ok(Json(dto::MessageResponse { message }))
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<dto::ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let ctx = services.context(&identity);
    let session = operations::reset_password(
        &ctx,
        &services.accounts,
        &body.password,
        &body.confirm_password,
        &body.reset_token,
    )
    .await?;
    Ok(session_response(session, services.cookie_secure))
}

/// `null` for anonymous callers.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Option<dto::UserView>>, ApiError> {
    let user = operations::me(&services.context(&identity)).await?;
    Ok(Json(user.as_ref().map(dto::UserView::from)))
}
