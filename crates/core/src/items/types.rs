//! Item domain types and repository contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ItemError;

/// A user-created item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item ID.
    pub id: Uuid,
    /// Display name, 1 to 100 characters.
    pub name: String,
    /// Optional description, at most 500 characters.
    pub description: Option<String>,
    /// Creating user, if the item was created in a session.
    pub user_id: Option<Uuid>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an item.
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Creating user.
    pub user_id: Option<Uuid>,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

impl ItemChanges {
    /// Returns true if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Apply the changes to an item, touching `updated_at`.
    pub fn apply(self, item: &mut Item, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = Some(description);
        }
        item.updated_at = now;
    }
}

/// Repository trait for item persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// All items, oldest first.
    async fn list(&self) -> Result<Vec<Item>, ItemError>;

    /// Find an item by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Item>, ItemError>;

    /// Insert an item.
    async fn create(&self, input: NewItem) -> Result<Item, ItemError>;

    /// Apply changes; `None` when the item does not exist.
    async fn update(&self, id: Uuid, changes: ItemChanges) -> Result<Option<Item>, ItemError>;

    /// Delete an item, returning whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool, ItemError>;
}
