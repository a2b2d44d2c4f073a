//! File metadata repository.
//!
//! Implements file metadata operations using SeaORM.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::files;
use tidepool_core::files::{
    FileError, FileRecord, FileRepository as FileRepoTrait, NewFileRecord,
};

/// File metadata repository implementation.
#[derive(Debug, Clone)]
pub struct FileRepository {
    db: DatabaseConnection,
}

impl FileRepository {
    /// Create a new file repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileRepoTrait for FileRepository {
    async fn create(&self, input: NewFileRecord) -> Result<FileRecord, FileError> {
        let now = Utc::now().into();
        let active_model = files::ActiveModel {
            id: Set(Uuid::new_v4()),
            key: Set(input.key),
            filename: Set(input.filename),
            mime_type: Set(input.mime_type),
            size: Set(input.size),
            user_id: Set(input.user_id),
            metadata: Set(input.metadata),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| FileError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<FileRecord>, FileError> {
        let model = files::Entity::find()
            .filter(files::Column::Key.eq(key))
            .one(&self.db)
            .await
            .map_err(|e| FileError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }

    async fn list(&self, owner: Option<Uuid>) -> Result<Vec<FileRecord>, FileError> {
        let mut query = files::Entity::find();
        if let Some(owner) = owner {
            query = query.filter(files::Column::UserId.eq(owner));
        }

        let models = query
            .order_by_asc(files::Column::CreatedAt)
            .order_by_asc(files::Column::Key)
            .all(&self.db)
            .await
            .map_err(|e| FileError::repository(e.to_string()))?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn delete_by_key(&self, key: &str) -> Result<bool, FileError> {
        let result = files::Entity::delete_many()
            .filter(files::Column::Key.eq(key))
            .exec(&self.db)
            .await
            .map_err(|e| FileError::repository(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

fn to_domain(model: files::Model) -> FileRecord {
    FileRecord {
        id: model.id,
        key: model.key,
        filename: model.filename,
        mime_type: model.mime_type,
        size: model.size,
        user_id: model.user_id,
        metadata: model.metadata,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    }
}
