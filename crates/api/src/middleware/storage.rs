//! Per-request storage backend selection.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;
use tidepool_core::storage::StorageService;
use tidepool_shared::AppError;

/// Backend chosen for this request.
#[derive(Clone)]
pub struct SelectedStorage(pub Arc<dyn StorageService>);

/// Selects the storage backend and stores it in the request extensions.
///
/// Selection failures short-circuit with the mapped error response.
pub async fn storage_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.storage.select() {
        Ok(backend) => {
            debug!(backend = backend.backend_name(), "storage selected");
            request.extensions_mut().insert(SelectedStorage(backend));
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

impl<S> FromRequestParts<S> for SelectedStorage
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal("storage backend not selected".to_string()).into())
    }
}
