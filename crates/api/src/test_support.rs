//! In-memory repositories and request helpers for router tests.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, Response, header::SET_COOKIE},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use opendal::{Operator, services};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppState, create_router};
use tidepool_core::auth::{
    AuthError, AuthRepository, AuthSession, Credential, NewSession, NewUser, Session, User,
};
use tidepool_core::files::{FileError, FileRecord, FileRepository, NewFileRecord};
use tidepool_core::items::{Item, ItemChanges, ItemError, ItemRepository, NewItem};
use tidepool_core::storage::StorageBindings;
use tidepool_shared::AppConfig;
use tidepool_shared::config::{
    AuthConfig, CorsConfig, DatabaseConfig, LogConfig, ServerConfig, StorageSettings,
};

pub const BOUNDARY: &str = "tidepool-test-boundary";

#[derive(Default)]
pub struct MemoryAuthRepository {
    users: Mutex<Vec<Credential>>,
    sessions: Mutex<BTreeMap<String, Session>>,
}

#[async_trait]
impl AuthRepository for MemoryAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find_credential(email).await?.map(|c| c.user))
    }

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AuthError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|c| c.user.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser, password_hash: String) -> Result<User, AuthError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            email_verified: false,
            image: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().push(Credential {
            user: user.clone(),
            password_hash,
        });
        Ok(user)
    }

    async fn create_session(&self, input: NewSession) -> Result<Session, AuthError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            expires_at: input.expires_at,
            ip_address: input.client.ip_address,
            user_agent: input.client.user_agent,
            created_at: now,
            updated_at: now,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(input.token_hash, session.clone());
        Ok(session)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<AuthSession>, AuthError> {
        let Some(session) = self.sessions.lock().unwrap().get(token_hash).cloned() else {
            return Ok(None);
        };
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|c| c.user.id == session.user_id)
            .map(|c| AuthSession {
                user: c.user.clone(),
                session,
            }))
    }

    async fn extend_session(
        &self,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        for session in self.sessions.lock().unwrap().values_mut() {
            if session.id == session_id {
                session.expires_at = expires_at;
                session.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.lock().unwrap().remove(token_hash).is_some())
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryItemRepository {
    items: Mutex<Vec<Item>>,
}

#[async_trait]
impl ItemRepository for MemoryItemRepository {
    async fn list(&self) -> Result<Vec<Item>, ItemError> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Item>, ItemError> {
        let items = self.items.lock().unwrap();
        Ok(items.iter().find(|i| i.id == id).cloned())
    }

    async fn create(&self, input: NewItem) -> Result<Item, ItemError> {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            user_id: input.user_id,
            created_at: now,
            updated_at: now,
        };
        self.items.lock().unwrap().push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: Uuid, changes: ItemChanges) -> Result<Option<Item>, ItemError> {
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        changes.apply(item, Utc::now());
        Ok(Some(item.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ItemError> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| i.id != id);
        Ok(items.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryFileRepository {
    rows: Mutex<Vec<FileRecord>>,
}

#[async_trait]
impl FileRepository for MemoryFileRepository {
    async fn create(&self, input: NewFileRecord) -> Result<FileRecord, FileError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.key == input.key) {
            return Err(FileError::repository("duplicate key"));
        }
        let now = Utc::now();
        let record = FileRecord {
            id: Uuid::new_v4(),
            key: input.key,
            filename: input.filename,
            mime_type: input.mime_type,
            size: input.size,
            user_id: input.user_id,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<FileRecord>, FileError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.key == key).cloned())
    }

    async fn list(&self, owner: Option<Uuid>) -> Result<Vec<FileRecord>, FileError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| owner.is_none() || r.user_id == owner)
            .cloned()
            .collect())
    }

    async fn delete_by_key(&self, key: &str) -> Result<bool, FileError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.key != key);
        Ok(rows.len() != before)
    }
}

pub fn test_config(local_root: &str) -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
            min_connections: 0,
            idle_timeout_secs: 1,
            connect_timeout_secs: 1,
        },
        auth: AuthConfig::default(),
        cors: CorsConfig::default(),
        log: LogConfig::default(),
        storage: StorageSettings {
            local_root: local_root.to_string(),
            public_url: None,
            bucket: None,
            max_upload_bytes: 1024 * 1024,
        },
    }
}

/// A router over in-memory repositories and a temporary storage root.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub root: TempDir,
}

impl TestApp {
    pub fn local() -> Self {
        Self::build(|bindings| bindings)
    }

    pub fn with_bucket() -> Self {
        Self::build(|bindings| {
            let operator = Operator::new(services::Memory::default())
                .unwrap()
                .finish();
            bindings.with_bucket(operator)
        })
    }

    fn build(bind: impl FnOnce(StorageBindings) -> StorageBindings) -> Self {
        let root = TempDir::new().unwrap();
        let config = test_config(root.path().to_str().unwrap());
        let storage = bind(StorageBindings::from_settings(&config.storage).unwrap());
        let state = AppState::with_repositories(
            config,
            sea_orm::DatabaseConnection::Disconnected,
            Arc::new(MemoryAuthRepository::default()),
            Arc::new(MemoryItemRepository::default()),
            Arc::new(MemoryFileRepository::default()),
            storage,
        );
        Self {
            router: create_router(state.clone()),
            state,
            root,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Signs up through the API and returns a `Cookie` header value.
    pub async fn sign_up(&self, email: &str) -> String {
        let body = serde_json::json!({
            "name": "Test User",
            "email": email,
            "password": "password123",
        });
        let response = self.send(json_request("POST", "/api/auth/sign-up/email", &body)).await;
        assert_eq!(response.status(), 200);
        session_cookie(&response)
    }
}

/// The `name=value` part of the session `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> String {
    let header = response
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie set")
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Body {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
