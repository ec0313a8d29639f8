use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fitshop_auth::{PermissionSet, ResetTicket, User};
use fitshop_core::{CartItemId, Email, ItemId, OrderId, UserId};
use fitshop_shop::{CartItem, Item, ItemChanges, Order};

use super::{Page, Store, StoreError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    items: HashMap<ItemId, Item>,
    cart: HashMap<CartItemId, CartItem>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory store for tests/dev.
///
/// A single lock guards all tables, so every method is trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, uuid::Uuid)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| &u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        Ok(users)
    }

    async fn set_reset_ticket(
        &self,
        id: UserId,
        ticket: ResetTicket,
    ) -> Result<Option<User>, StoreError> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.id != id && u.reset.as_ref().is_some_and(|r| r.token == ticket.token)) {
            return Err(StoreError::Conflict("reset token already in use".to_string()));
        }
        Ok(t.users.get_mut(&id).map(|user| {
            user.reset = Some(ticket);
            user.clone()
        }))
    }

    async fn redeem_reset_ticket(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut t = self.write()?;
        let user = t
            .users
            .values_mut()
            .find(|u| u.reset.as_ref().is_some_and(|r| r.redeemable_with(token, now)));

        Ok(user.map(|user| {
            user.password_hash = password_hash.to_string();
            user.reset = None;
            user.clone()
        }))
    }

    async fn replace_permissions(
        &self,
        id: UserId,
        permissions: PermissionSet,
    ) -> Result<Option<User>, StoreError> {
        let mut t = self.write()?;
        Ok(t.users.get_mut(&id).map(|user| {
            user.permissions = permissions;
            user.clone()
        }))
    }

    async fn insert_item(&self, item: Item) -> Result<Item, StoreError> {
        self.write()?.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn list_items(&self, page: Page) -> Result<Vec<Item>, StoreError> {
        let mut items: Vec<Item> = self.read()?.items.values().cloned().collect();
        newest_first(&mut items, |i| (i.created_at, *i.id.as_uuid()));
        Ok(items
            .into_iter()
            .skip(page.skip as usize)
            .take(page.first as usize)
            .collect())
    }

    async fn count_items(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.items.len() as u64)
    }

    async fn update_item(
        &self,
        id: ItemId,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, StoreError> {
        let mut t = self.write()?;
        Ok(t.items.get_mut(&id).map(|item| {
            changes.apply_to(item);
            item.clone()
        }))
    }

    async fn delete_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let mut t = self.write()?;
        let removed = t.items.remove(&id);
        if removed.is_some() {
            t.cart.retain(|_, line| line.item_id != id);
        }
        Ok(removed)
    }

    async fn cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        Ok(self.read()?.cart.get(&id).cloned())
    }

    async fn cart_item_for(
        &self,
        owner: UserId,
        item: ItemId,
    ) -> Result<Option<CartItem>, StoreError> {
        Ok(self
            .read()?
            .cart
            .values()
            .find(|l| l.owner_id == owner && l.item_id == item)
            .cloned())
    }

    async fn cart_items(&self, owner: UserId) -> Result<Vec<CartItem>, StoreError> {
        let mut lines: Vec<CartItem> = self
            .read()?
            .cart
            .values()
            .filter(|l| l.owner_id == owner)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.id);
        Ok(lines)
    }

    async fn insert_cart_item(&self, line: CartItem) -> Result<CartItem, StoreError> {
        let mut t = self.write()?;
        if t.cart.values().any(|l| l.owner_id == line.owner_id && l.item_id == line.item_id) {
            return Err(StoreError::Conflict(format!(
                "cart line for item {} already exists",
                line.item_id
            )));
        }
        t.cart.insert(line.id, line.clone());
        Ok(line)
    }

    async fn increment_cart_item(
        &self,
        id: CartItemId,
        expected_quantity: u32,
    ) -> Result<Option<CartItem>, StoreError> {
        let mut t = self.write()?;
        let Some(line) = t.cart.get_mut(&id) else {
            return Ok(None);
        };
        if line.quantity != expected_quantity {
            return Err(StoreError::Conflict(format!(
                "cart line quantity is {}, expected {expected_quantity}",
                line.quantity
            )));
        }
        *line = line.incremented();
        Ok(Some(line.clone()))
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        Ok(self.write()?.cart.remove(&id))
    }

    async fn insert_order(&self, order: Order) -> Result<Order, StoreError> {
        self.write()?.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn orders_for(&self, owner: UserId) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .read()?
            .orders
            .values()
            .filter(|o| o.owner_id == owner)
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, *o.id.as_uuid()));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use fitshop_auth::{NewUser, Permission};
    use fitshop_shop::NewItem;

    use super::*;

    fn user(email: &str) -> User {
        NewUser::new(Email::parse(email).unwrap(), "Someone", "hash".into())
            .unwrap()
            .into_user(Utc::now())
    }

    fn item(owner: UserId, title: &str, at: DateTime<Utc>) -> Item {
        NewItem {
            title: title.into(),
            description: String::new(),
            price: 100,
            image: None,
            large_image: None,
        }
        .into_item(owner, at)
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = InMemoryStore::new();
        store.insert_user(user("a@example.com")).await.unwrap();
        let err = store.insert_user(user("A@Example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn reset_ticket_redeems_once() {
        let store = InMemoryStore::new();
        let u = store.insert_user(user("a@example.com")).await.unwrap();
        let now = Utc::now();
        let ticket = ResetTicket::issue(now);
        store.set_reset_ticket(u.id, ticket.clone()).await.unwrap();

        let redeemed = store.redeem_reset_ticket(&ticket.token, now, "new-hash").await.unwrap().unwrap();
        assert_eq!(redeemed.password_hash, "new-hash");
        assert!(redeemed.reset.is_none());

        assert!(store.redeem_reset_ticket(&ticket.token, now, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_ticket_does_not_redeem() {
        let store = InMemoryStore::new();
        let u = store.insert_user(user("a@example.com")).await.unwrap();
        let issued = Utc::now();
        let ticket = ResetTicket::issue(issued);
        store.set_reset_ticket(u.id, ticket.clone()).await.unwrap();

        let later = issued + Duration::hours(2);
        assert!(store.redeem_reset_ticket(&ticket.token, later, "h").await.unwrap().is_none());
        let still_there = store.user(u.id).await.unwrap().unwrap();
        assert_eq!(still_there.reset, Some(ticket));
        assert_eq!(still_there.password_hash, "hash");
    }

    #[tokio::test]
    async fn permissions_are_replaced_not_merged() {
        let store = InMemoryStore::new();
        let u = store.insert_user(user("a@example.com")).await.unwrap();
        let updated = store
            .replace_permissions(u.id, [Permission::ItemCreate].into_iter().collect())
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.permissions.contains(Permission::User));
        assert!(updated.permissions.contains(Permission::ItemCreate));
    }

    #[tokio::test]
    async fn items_list_newest_first_with_paging() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let t0 = Utc::now();
        for (i, title) in ["old", "mid", "new"].iter().enumerate() {
            store.insert_item(item(owner, title, t0 + Duration::seconds(i as i64))).await.unwrap();
        }

        let first = store.list_items(Page::new(None, Some(2))).await.unwrap();
        let titles: Vec<_> = first.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["new", "mid"]);

        let rest = store.list_items(Page::new(Some(2), Some(2))).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].title, "old");
        assert_eq!(store.count_items().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn cart_line_is_unique_per_owner_and_item() {
        let store = InMemoryStore::new();
        let (owner, item_id) = (UserId::new(), ItemId::new());
        store.insert_cart_item(CartItem::new(owner, item_id)).await.unwrap();
        let err = store.insert_cart_item(CartItem::new(owner, item_id)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.insert_cart_item(CartItem::new(UserId::new(), item_id)).await.unwrap();
    }

    #[tokio::test]
    async fn stale_increment_conflicts() {
        let store = InMemoryStore::new();
        let line = store.insert_cart_item(CartItem::new(UserId::new(), ItemId::new())).await.unwrap();

        let bumped = store.increment_cart_item(line.id, 1).await.unwrap().unwrap();
        assert_eq!(bumped.quantity, 2);
        assert!(matches!(store.increment_cart_item(line.id, 1).await, Err(StoreError::Conflict(_))));
        assert!(store.increment_cart_item(CartItemId::new(), 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_an_item_drops_its_cart_lines() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let it = store.insert_item(item(owner, "shirt", Utc::now())).await.unwrap();
        store.insert_cart_item(CartItem::new(owner, it.id)).await.unwrap();

        assert!(store.delete_item(it.id).await.unwrap().is_some());
        assert!(store.item(it.id).await.unwrap().is_none());
        assert!(store.cart_items(owner).await.unwrap().is_empty());
    }
}
