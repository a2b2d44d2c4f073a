//! Users, credential accounts and sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{accounts, sessions, users};
use tidepool_core::auth::{
    AuthError, AuthRepository as AuthRepoTrait, AuthSession, Credential, NewSession, NewUser,
    Session, User,
};

/// Auth repository implementation.
#[derive(Debug, Clone)]
pub struct AuthRepository {
    db: DatabaseConnection,
}

impl AuthRepository {
    /// Creates a new auth repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Deletes sessions that expired before now.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self) -> Result<u64, DbErr> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

fn repo_err(err: DbErr) -> AuthError {
    AuthError::repository(err.to_string())
}

#[async_trait]
impl AuthRepoTrait for AuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(user_to_domain))
    }

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AuthError> {
        let Some(user) = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(repo_err)?
        else {
            return Ok(None);
        };

        let account = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user.id))
            .filter(accounts::Column::ProviderId.eq(accounts::CREDENTIAL_PROVIDER))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(account
            .and_then(|a| a.password)
            .map(|password_hash| Credential {
                user: user_to_domain(user),
                password_hash,
            }))
    }

    async fn create_user(&self, user: NewUser, password_hash: String) -> Result<User, AuthError> {
        let now = Utc::now().into();
        let user_id = Uuid::new_v4();
        let txn = self.db.begin().await.map_err(repo_err)?;

        let model = users::ActiveModel {
            id: Set(user_id),
            name: Set(user.name),
            email: Set(user.email),
            email_verified: Set(false),
            image: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AuthError::EmailTaken,
            _ => repo_err(e),
        })?;

        accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            account_id: Set(user_id.to_string()),
            provider_id: Set(accounts::CREDENTIAL_PROVIDER.to_string()),
            password: Set(Some(password_hash)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(repo_err)?;

        txn.commit().await.map_err(repo_err)?;
        Ok(user_to_domain(model))
    }

    async fn create_session(&self, input: NewSession) -> Result<Session, AuthError> {
        let now = Utc::now().into();
        let model = sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(input.user_id),
            token_hash: Set(input.token_hash),
            expires_at: Set(input.expires_at.into()),
            ip_address: Set(input.client.ip_address),
            user_agent: Set(input.client.user_agent),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(session_to_domain(model))
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<AuthSession>, AuthError> {
        let found = sessions::Entity::find()
            .filter(sessions::Column::TokenHash.eq(token_hash))
            .find_also_related(users::Entity)
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(match found {
            Some((session, Some(user))) => Some(AuthSession {
                user: user_to_domain(user),
                session: session_to_domain(session),
            }),
            _ => None,
        })
    }

    async fn extend_session(
        &self,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sessions::ActiveModel {
            id: Set(session_id),
            expires_at: Set(expires_at.into()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(repo_err)?;

        Ok(())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, AuthError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::TokenHash.eq(token_hash))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError> {
        let models = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .order_by_desc(sessions::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(models.into_iter().map(session_to_domain).collect())
    }
}

fn user_to_domain(model: users::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        email_verified: model.email_verified,
        image: model.image,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    }
}

fn session_to_domain(model: sessions::Model) -> Session {
    Session {
        id: model.id,
        user_id: model.user_id,
        expires_at: model.expires_at.into(),
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    }
}
