//! Item repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::entities::items;
use tidepool_core::items::{
    Item, ItemChanges, ItemError, ItemRepository as ItemRepoTrait, NewItem,
};

/// Item repository implementation.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    db: DatabaseConnection,
}

impl ItemRepository {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemRepoTrait for ItemRepository {
    async fn list(&self) -> Result<Vec<Item>, ItemError> {
        let models = items::Entity::find()
            .order_by_asc(items::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| ItemError::repository(e.to_string()))?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Item>, ItemError> {
        let model = items::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ItemError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }

    async fn create(&self, input: NewItem) -> Result<Item, ItemError> {
        let now = Utc::now().into();
        let model = items::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            user_id: Set(input.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| ItemError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn update(&self, id: Uuid, changes: ItemChanges) -> Result<Option<Item>, ItemError> {
        let Some(existing) = items::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ItemError::repository(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut active: items::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now().into());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| ItemError::repository(e.to_string()))?;

        Ok(Some(to_domain(model)))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ItemError> {
        let result = items::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| ItemError::repository(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

fn to_domain(model: items::Model) -> Item {
    Item {
        id: model.id,
        name: model.name,
        description: model.description,
        user_id: model.user_id,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    }
}
