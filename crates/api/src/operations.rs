//! Externally callable operations.
//!
//! Each one is: identity (already resolved by the middleware) → authorization
//! → domain logic → result. Mutations that fail authorization return before
//! touching the store. Every span carries a `user_id` field, filled once the
//! caller is known.

use tracing::{field, instrument};

use fitshop_auth::{
    Permission, PermissionSet, User, authorize_delete_item, authorize_list_users,
    authorize_read_order, authorize_update_permissions,
};
use fitshop_core::{CartItemId, ItemId, OrderId, UserId};
use fitshop_infra::Page;
use fitshop_shop::{CartItem, Item, ItemChanges, NewItem, Order};

use crate::accounts::{Accounts, Session};
use crate::authz;
use crate::cart;
use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};

pub const SIGNOUT_MESSAGE: &str = "Goodbye!";
pub const RESET_REQUESTED_MESSAGE: &str = "Thanks! Check your email for a reset link.";

// ── items ────────────────────────────────────────────────────────────────

#[instrument(name = "create_item", skip_all, fields(user_id = field::Empty), err(Display))]
pub async fn create_item(ctx: &RequestContext<'_>, input: NewItem) -> ApiResult<Item> {
    let principal = ctx.principal().await?;
    let item = input.into_item(principal.id(), ctx.now())?;
    let item = ctx.store().insert_item(item).await?;
    tracing::info!(item_id = %item.id, "item created");
    Ok(item)
}

/// Any caller, signed in or not, may update any item. There is no ownership
/// check here.
#[instrument(
    name = "update_item",
    skip_all,
    fields(item_id = %id, user_id = field::Empty),
    err(Display)
)]
pub async fn update_item(
    ctx: &RequestContext<'_>,
    id: ItemId,
    changes: ItemChanges,
) -> ApiResult<Item> {
    ctx.record_caller();
    changes.validate()?;
    ctx.store()
        .update_item(id, &changes)
        .await?
        .ok_or(ApiError::NotFound("item"))
}

#[instrument(
    name = "delete_item",
    skip_all,
    fields(item_id = %id, user_id = field::Empty),
    err(Display)
)]
pub async fn delete_item(ctx: &RequestContext<'_>, id: ItemId) -> ApiResult<Item> {
    let principal = ctx.principal().await?;
    let item = ctx.store().item(id).await?.ok_or(ApiError::NotFound("item"))?;
    authz::enforce(&principal, authorize_delete_item(&principal, &item))?;

    let deleted = ctx
        .store()
        .delete_item(id)
        .await?
        .ok_or(ApiError::NotFound("item"))?;
    tracing::info!("item deleted");
    Ok(deleted)
}

#[instrument(name = "items", skip_all, fields(user_id = field::Empty), err(Display))]
pub async fn items(ctx: &RequestContext<'_>, page: Page) -> ApiResult<Vec<Item>> {
    ctx.record_caller();
    Ok(ctx.store().list_items(page).await?)
}

#[instrument(name = "item", skip_all, fields(item_id = %id, user_id = field::Empty), err(Display))]
pub async fn item(ctx: &RequestContext<'_>, id: ItemId) -> ApiResult<Item> {
    ctx.record_caller();
    ctx.store().item(id).await?.ok_or(ApiError::NotFound("item"))
}

#[instrument(name = "items_count", skip_all, fields(user_id = field::Empty), err(Display))]
pub async fn items_count(ctx: &RequestContext<'_>) -> ApiResult<u64> {
    ctx.record_caller();
    Ok(ctx.store().count_items().await?)
}

// ── accounts ─────────────────────────────────────────────────────────────
//
// `Accounts` opens its own spans and records the user once it is known.

pub async fn signup(
    ctx: &RequestContext<'_>,
    accounts: &Accounts,
    email: &str,
    password: &str,
    name: &str,
) -> ApiResult<Session> {
    accounts.signup(ctx.store(), email, password, name, ctx.now()).await
}

pub async fn signin(
    ctx: &RequestContext<'_>,
    accounts: &Accounts,
    email: &str,
    password: &str,
) -> ApiResult<Session> {
    accounts.signin(ctx.store(), email, password).await
}

/// Nothing to do server-side: credentials are not tracked, so signing out is
/// the client dropping its cookie.
#[instrument(name = "signout", skip_all, fields(user_id = field::Empty))]
pub fn signout(ctx: &RequestContext<'_>) -> &'static str {
    ctx.record_caller();
    tracing::info!("signed out");
    SIGNOUT_MESSAGE
}

pub async fn request_reset(
    ctx: &RequestContext<'_>,
    accounts: &Accounts,
    email: &str,
) -> ApiResult<&'static str> {
    accounts
        .request_reset(ctx.store(), ctx.mailer(), email, ctx.now())
        .await?;
    Ok(RESET_REQUESTED_MESSAGE)
}

pub async fn reset_password(
    ctx: &RequestContext<'_>,
    accounts: &Accounts,
    password: &str,
    confirm_password: &str,
    reset_token: &str,
) -> ApiResult<Session> {
    accounts
        .reset_password(ctx.store(), password, confirm_password, reset_token, ctx.now())
        .await
}

/// The signed-in user, or `None`. A missing or rejected credential is not an
/// error here.
#[instrument(name = "me", skip_all, fields(user_id = field::Empty), err(Display))]
pub async fn me(ctx: &RequestContext<'_>) -> ApiResult<Option<User>> {
    ctx.record_caller();
    match ctx.identity().user_id() {
        Some(id) => Ok(ctx.store().user(id).await?),
        None => Ok(None),
    }
}

// ── users ────────────────────────────────────────────────────────────────

#[instrument(name = "users", skip_all, fields(user_id = field::Empty), err(Display))]
pub async fn users(ctx: &RequestContext<'_>) -> ApiResult<Vec<User>> {
    let principal = ctx.principal().await?;
    authz::enforce(&principal, authorize_list_users(&principal))?;
    Ok(ctx.store().list_users().await?)
}

/// Replace the target's permissions with exactly `permissions`.
#[instrument(
    name = "update_permissions",
    skip_all,
    fields(target = %target, user_id = field::Empty),
    err(Display)
)]
pub async fn update_permissions(
    ctx: &RequestContext<'_>,
    target: UserId,
    permissions: Vec<Permission>,
) -> ApiResult<User> {
    let principal = ctx.principal().await?;
    authz::enforce(&principal, authorize_update_permissions(&principal))?;

    let permissions: PermissionSet = permissions.into_iter().collect();
    let user = ctx
        .store()
        .replace_permissions(target, permissions)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    tracing::info!(permissions = ?user.permissions.to_strings(), "permissions replaced");
    Ok(user)
}

// ── cart ─────────────────────────────────────────────────────────────────

#[instrument(
    name = "add_to_cart",
    skip_all,
    fields(item_id = %item_id, user_id = field::Empty),
    err(Display)
)]
pub async fn add_to_cart(ctx: &RequestContext<'_>, item_id: ItemId) -> ApiResult<CartItem> {
    let principal = ctx.principal().await?;
    cart::add_to_cart(ctx.store(), principal.id(), item_id).await
}

#[instrument(
    name = "remove_from_cart",
    skip_all,
    fields(cart_item_id = %id, user_id = field::Empty),
    err(Display)
)]
pub async fn remove_from_cart(ctx: &RequestContext<'_>, id: CartItemId) -> ApiResult<CartItem> {
    let principal = ctx.principal().await?;
    cart::remove_from_cart(ctx.store(), &principal, id).await
}

#[instrument(name = "cart", skip_all, fields(user_id = field::Empty), err(Display))]
pub async fn cart(ctx: &RequestContext<'_>) -> ApiResult<Vec<CartItem>> {
    let principal = ctx.principal().await?;
    Ok(ctx.store().cart_items(principal.id()).await?)
}

// ── orders ───────────────────────────────────────────────────────────────

#[instrument(
    name = "order",
    skip_all,
    fields(order_id = %id, user_id = field::Empty),
    err(Display)
)]
pub async fn order(ctx: &RequestContext<'_>, id: OrderId) -> ApiResult<Order> {
    let principal = ctx.principal().await?;
    let order = ctx.store().order(id).await?.ok_or(ApiError::NotFound("order"))?;
    authz::enforce(&principal, authorize_read_order(&principal, &order))?;
    Ok(order)
}

/// The caller's own orders, newest first.
#[instrument(name = "orders", skip_all, fields(user_id = field::Empty), err(Display))]
pub async fn orders(ctx: &RequestContext<'_>) -> ApiResult<Vec<Order>> {
    let principal = ctx.principal().await?;
    Ok(ctx.store().orders_for(principal.id()).await?)
}
