//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for items, files, auth and health
//! - Session and storage-selection middleware
//! - The response envelope and error rendering

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{
        HeaderName, HeaderValue, Method, Uri,
        header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE},
    },
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::Key;
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha512};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::error::ApiError;
use crate::middleware::X_RESPONSE_TIME;
use crate::routes::files::X_FILENAME;
use tidepool_core::auth::{AuthRepository, AuthService, SessionPolicy};
use tidepool_core::files::FileRepository;
use tidepool_core::items::ItemRepository;
use tidepool_core::storage::StorageBindings;
use tidepool_shared::{AppConfig, AppError};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Sign-up, sign-in and session resolution.
    pub auth: Arc<AuthService>,
    /// Item persistence.
    pub items: Arc<dyn ItemRepository>,
    /// File metadata persistence.
    pub files: Arc<dyn FileRepository>,
    /// Storage handles; the backend is picked per request.
    pub storage: StorageBindings,
    cookie_key: Key,
}

impl AppState {
    /// State backed by the SeaORM repositories.
    #[must_use]
    pub fn new(config: AppConfig, db: DatabaseConnection, storage: StorageBindings) -> Self {
        let auth = Arc::new(tidepool_db::AuthRepository::new(db.clone()));
        let items = Arc::new(tidepool_db::ItemRepository::new(db.clone()));
        let files = Arc::new(tidepool_db::FileRepository::new(db.clone()));
        Self::with_repositories(config, db, auth, items, files, storage)
    }

    /// State with explicit repository implementations.
    #[must_use]
    pub fn with_repositories(
        config: AppConfig,
        db: DatabaseConnection,
        auth: Arc<dyn AuthRepository>,
        items: Arc<dyn ItemRepository>,
        files: Arc<dyn FileRepository>,
        storage: StorageBindings,
    ) -> Self {
        let policy = SessionPolicy::from_config(&config.auth);
        let cookie_key = cookie_key(&config.auth.secret);
        Self {
            config: Arc::new(config),
            db: Arc::new(db),
            auth: Arc::new(AuthService::new(auth, policy)),
            items,
            files,
            storage,
            cookie_key,
        }
    }
}

/// Signing key derived from the auth secret; SHA-512 yields the 64 bytes
/// the cookie key needs.
fn cookie_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .origin_list()
        .into_iter()
        .filter(|origin| {
            if origin == "*" {
                warn!("wildcard CORS origin ignored; credentials require explicit origins");
                return false;
            }
            true
        })
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, X_REQUEST_ID, X_FILENAME])
        .expose_headers([X_REQUEST_ID, X_RESPONSE_TIME, CONTENT_DISPOSITION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86_400))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_owned();
    error!(panic = %detail, "handler panicked");
    ApiError(AppError::Internal(detail)).into_response()
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    AppError::not_found("NOT_FOUND", format!("Route {method} {} not found", uri.path())).into()
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    AppError::Http {
        status: 405,
        message: format!("Method {method} not allowed on {}", uri.path()),
    }
    .into()
}

/// Creates the main application router.
///
/// Layer order, outermost first: request id, sensitive header marking,
/// tracing, request context, security headers, CORS, panic recovery.
pub fn create_router(state: AppState) -> Router {
    let session = from_fn_with_state(state.clone(), middleware::session_middleware);
    let items = routes::items::routes().route_layer(session.clone());
    let files = routes::files::routes()
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::storage_middleware,
        ))
        .route_layer(session);

    Router::new()
        .route("/", get(routes::root::index))
        .merge(routes::health::routes())
        .nest("/api/auth", routes::auth::routes())
        .nest("/api/items", items)
        .nest("/api/files", files)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION, COOKIE]))
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(middleware::request_context))
                .layer(from_fn(middleware::secure_headers))
                .layer(cors_layer(&state.config))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}
