use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fitshop_core::{DomainError, Entity, ItemId, Owned, UserId};

/// A catalog item. The owner is the principal that created it and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    /// Price in cents.
    pub price: i64,
    pub image: Option<String>,
    pub large_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Owned for Item {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title cannot be empty"));
    }
    Ok(())
}

fn validate_price(price: i64) -> Result<(), DomainError> {
    if price < 0 {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub image: Option<String>,
    pub large_image: Option<String>,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_title(&self.title)?;
        validate_price(self.price)
    }

    /// Materialize the item for `owner`.
    pub fn into_item(self, owner_id: UserId, created_at: DateTime<Utc>) -> Result<Item, DomainError> {
        self.validate()?;
        Ok(Item {
            id: ItemId::new(),
            owner_id,
            title: self.title.trim().to_string(),
            description: self.description,
            price: self.price,
            image: self.image,
            large_image: self.large_image,
            created_at,
        })
    }
}

/// Partial update: only supplied fields change. Ownership is not updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub image: Option<String>,
    pub large_image: Option<String>,
}

impl ItemChanges {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, item: &mut Item) {
        if let Some(title) = &self.title {
            item.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(image) = &self.image {
            item.image = Some(image.clone());
        }
        if let Some(large_image) = &self.large_image {
            item.large_image = Some(large_image.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> NewItem {
        NewItem {
            title: " Shirt ".into(),
            description: "Cotton".into(),
            price: 2500,
            image: None,
            large_image: None,
        }
    }

    #[test]
    fn creator_becomes_owner() {
        let owner = UserId::new();
        let item = shirt().into_item(owner, Utc::now()).unwrap();
        assert_eq!(item.owner_id(), owner);
        assert_eq!(item.title, "Shirt");
    }

    #[test]
    fn invalid_items_are_rejected() {
        let blank = NewItem { title: "  ".into(), ..shirt() };
        assert!(blank.into_item(UserId::new(), Utc::now()).is_err());

        let negative = NewItem { price: -1, ..shirt() };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn changes_touch_only_supplied_fields() {
        let mut item = shirt().into_item(UserId::new(), Utc::now()).unwrap();
        let before = item.clone();
        let changes = ItemChanges {
            price: Some(1999),
            ..Default::default()
        };
        changes.validate().unwrap();
        changes.apply_to(&mut item);

        assert_eq!(item.price, 1999);
        assert_eq!(item.title, before.title);
        assert_eq!(item.owner_id, before.owner_id);
    }

    #[test]
    fn changes_are_validated() {
        let changes = ItemChanges {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(changes.validate().is_err());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let item = shirt().into_item(UserId::new(), Utc::now()).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("ownerId").is_some());
        assert!(json.get("largeImage").is_some());
    }
}
