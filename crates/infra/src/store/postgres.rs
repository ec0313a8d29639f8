//! Postgres-backed store.
//!
//! The two read-modify-write sequences are single conditional statements:
//!
//! - reset redemption is `UPDATE ... WHERE reset_token = $1 AND
//!   reset_token_expiry >= $2`, so two concurrent redemptions of one token
//!   serialize on the row lock and the loser matches nothing;
//! - cart increments are compare-and-set on `quantity`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|-----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check violation) | `23514` | `Conflict` |
//! | Database (other) | any | `Unavailable` |
//! | PoolClosed / Io / other | n/a | `Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use fitshop_auth::{Permission, PermissionSet, ResetTicket, User};
use fitshop_core::{CartItemId, Email, ItemId, OrderId, UserId};
use fitshop_shop::{CartItem, Item, ItemChanges, Order, OrderLine};

use super::{Page, Store, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_fitshop.sql");

const USER_COLUMNS: &str =
    "id, email, name, password_hash, permissions, reset_token, reset_token_expiry, created_at";
const ITEM_COLUMNS: &str =
    "id, owner_id, title, description, price, image, large_image, created_at";
const CART_COLUMNS: &str = "id, owner_id, item_id, quantity";
const ORDER_COLUMNS: &str = "id, owner_id, total, charge, lines, created_at";

/// Postgres-backed transactional store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn fetch_user(&self, operation: &str, sql: &str, bind: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query(sql)
            .bind(bind)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?
            .map(|row| user_from_row(&row))
            .transpose()
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip_all, fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, email, name, password_hash, permissions, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.permissions.to_strings())
        .bind(user.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        user_from_row(&row)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch_user(
            "user",
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"),
            *id.as_uuid(),
        )
        .await
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_email", e))?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY email"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?
            .iter()
            .map(user_from_row)
            .collect()
    }

    #[instrument(skip(self, ticket), fields(user_id = %id), err)]
    async fn set_reset_ticket(
        &self,
        id: UserId,
        ticket: ResetTicket,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!(
            "UPDATE users SET reset_token = $2, reset_token_expiry = $3 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&ticket.token)
        .bind(ticket.expires_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_reset_ticket", e))?
        .map(|row| user_from_row(&row))
        .transpose()
    }

    #[instrument(skip_all, err)]
    async fn redeem_reset_ticket(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!(
            "UPDATE users \
             SET password_hash = $3, reset_token = NULL, reset_token_expiry = NULL \
             WHERE reset_token = $1 AND reset_token_expiry >= $2 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(token)
        .bind(now)
        .bind(password_hash)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("redeem_reset_ticket", e))?
        .map(|row| user_from_row(&row))
        .transpose()
    }

    #[instrument(skip(self, permissions), fields(user_id = %id), err)]
    async fn replace_permissions(
        &self,
        id: UserId,
        permissions: PermissionSet,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!(
            "UPDATE users SET permissions = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(permissions.to_strings())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace_permissions", e))?
        .map(|row| user_from_row(&row))
        .transpose()
    }

    async fn insert_item(&self, item: Item) -> Result<Item, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO items (id, owner_id, title, description, price, image, large_image, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item.id.as_uuid())
        .bind(item.owner_id.as_uuid())
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.price)
        .bind(&item.image)
        .bind(&item.large_image)
        .bind(item.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        item_from_row(&row)
    }

    async fn item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("item", e))?
            .map(|row| item_from_row(&row))
            .transpose()
    }

    async fn list_items(&self, page: Page) -> Result<Vec<Item>, StoreError> {
        sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2"
        ))
        .bind(i64::from(page.skip))
        .bind(i64::from(page.first))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?
        .iter()
        .map(item_from_row)
        .collect()
    }

    async fn count_items(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items", e))?;
        u64::try_from(count).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn update_item(
        &self,
        id: ItemId,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, StoreError> {
        sqlx::query(&format!(
            "UPDATE items SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                price = COALESCE($4, price), \
                image = COALESCE($5, image), \
                large_image = COALESCE($6, large_image) \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(changes.title.as_deref().map(str::trim))
        .bind(&changes.description)
        .bind(changes.price)
        .bind(&changes.image)
        .bind(&changes.large_image)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?
        .map(|row| item_from_row(&row))
        .transpose()
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        sqlx::query(&format!("DELETE FROM items WHERE id = $1 RETURNING {ITEM_COLUMNS}"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?
            .map(|row| item_from_row(&row))
            .transpose()
    }

    async fn cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        sqlx::query(&format!("SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("cart_item", e))?
            .map(|row| cart_item_from_row(&row))
            .transpose()
    }

    async fn cart_item_for(
        &self,
        owner: UserId,
        item: ItemId,
    ) -> Result<Option<CartItem>, StoreError> {
        sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE owner_id = $1 AND item_id = $2"
        ))
        .bind(owner.as_uuid())
        .bind(item.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_item_for", e))?
        .map(|row| cart_item_from_row(&row))
        .transpose()
    }

    async fn cart_items(&self, owner: UserId) -> Result<Vec<CartItem>, StoreError> {
        sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_items", e))?
        .iter()
        .map(cart_item_from_row)
        .collect()
    }

    async fn insert_cart_item(&self, line: CartItem) -> Result<CartItem, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO cart_items (id, owner_id, item_id, quantity) \
             VALUES ($1, $2, $3, $4) RETURNING {CART_COLUMNS}"
        ))
        .bind(line.id.as_uuid())
        .bind(line.owner_id.as_uuid())
        .bind(line.item_id.as_uuid())
        .bind(quantity_to_db(line.quantity)?)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_cart_item", e))?;
        cart_item_from_row(&row)
    }

    #[instrument(skip(self), fields(cart_item_id = %id), err)]
    async fn increment_cart_item(
        &self,
        id: CartItemId,
        expected_quantity: u32,
    ) -> Result<Option<CartItem>, StoreError> {
        let updated = sqlx::query(&format!(
            "UPDATE cart_items SET quantity = quantity + 1 \
             WHERE id = $1 AND quantity = $2 RETURNING {CART_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(quantity_to_db(expected_quantity)?)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("increment_cart_item", e))?;

        match updated {
            Some(row) => cart_item_from_row(&row).map(Some),
            None => match self.cart_item(id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "cart line quantity is {}, expected {expected_quantity}",
                    current.quantity
                ))),
                None => Ok(None),
            },
        }
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        sqlx::query(&format!("DELETE FROM cart_items WHERE id = $1 RETURNING {CART_COLUMNS}"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cart_item", e))?
            .map(|row| cart_item_from_row(&row))
            .transpose()
    }

    async fn insert_order(&self, order: Order) -> Result<Order, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO orders (id, owner_id, total, charge, lines, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id.as_uuid())
        .bind(order.owner_id.as_uuid())
        .bind(order.total)
        .bind(&order.charge)
        .bind(Json(&order.lines))
        .bind(order.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        order_from_row(&row)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("order", e))?
            .map(|row| order_from_row(&row))
            .transpose()
    }

    async fn orders_for(&self, owner: UserId) -> Result<Vec<Order>, StoreError> {
        sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders_for", e))?
        .iter()
        .map(order_from_row)
        .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let email: String = column(row, "email")?;
    let permissions: Vec<String> = column(row, "permissions")?;
    let permissions = permissions
        .iter()
        .map(|p| p.parse::<Permission>())
        .collect::<Result<PermissionSet, _>>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    let token: Option<String> = column(row, "reset_token")?;
    let expiry: Option<DateTime<Utc>> = column(row, "reset_token_expiry")?;
    let reset = match (token, expiry) {
        (Some(token), Some(expires_at)) => Some(ResetTicket { token, expires_at }),
        _ => None,
    };

    Ok(User {
        id: UserId::from_uuid(column(row, "id")?),
        email: Email::parse(&email).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        name: column(row, "name")?,
        password_hash: column(row, "password_hash")?,
        permissions,
        reset,
        created_at: column(row, "created_at")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    Ok(Item {
        id: ItemId::from_uuid(column(row, "id")?),
        owner_id: UserId::from_uuid(column(row, "owner_id")?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        price: column(row, "price")?,
        image: column(row, "image")?,
        large_image: column(row, "large_image")?,
        created_at: column(row, "created_at")?,
    })
}

fn cart_item_from_row(row: &PgRow) -> Result<CartItem, StoreError> {
    let quantity: i32 = column(row, "quantity")?;
    Ok(CartItem {
        id: CartItemId::from_uuid(column(row, "id")?),
        owner_id: UserId::from_uuid(column(row, "owner_id")?),
        item_id: ItemId::from_uuid(column(row, "item_id")?),
        quantity: u32::try_from(quantity).map_err(|e| StoreError::Corrupt(e.to_string()))?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let Json(lines): Json<Vec<OrderLine>> = column(row, "lines")?;
    Ok(Order {
        id: OrderId::from_uuid(column(row, "id")?),
        owner_id: UserId::from_uuid(column(row, "owner_id")?),
        total: column(row, "total")?,
        charge: column(row, "charge")?,
        lines,
        created_at: column(row, "created_at")?,
    })
}

fn quantity_to_db(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::Conflict("cart quantity overflow".to_string()))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, other)),
    }
}
