//! Session resolution for protected and optional-auth routes.
//!
//! The raw session token comes from the signed session cookie or an
//! `Authorization: Bearer` header. Resolution never rejects a request:
//! handlers decide whether a missing session is an error.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::SignedCookieJar;
use std::convert::Infallible;
use tracing::warn;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use tidepool_core::auth::AuthSession;
use tidepool_shared::AppError;

/// Name of the signed session cookie.
pub const SESSION_COOKIE: &str = "tidepool.session_token";

/// The session resolved for this request, if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<AuthSession>);

impl CurrentSession {
    /// Id of the signed-in user.
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|auth| auth.user.id)
    }

    /// The session, or `401 UNAUTHORIZED`.
    pub fn require(self) -> Result<AuthSession, ApiError> {
        self.0
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()).into())
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_default())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Raw session token: signed cookie first, then bearer header.
#[must_use]
pub fn session_token(jar: &SignedCookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .or_else(|| bearer_token(headers).map(String::from))
}

/// Resolve a token, treating lookup failures as "no session".
pub async fn resolve_session(state: &AppState, token: Option<&str>) -> Option<AuthSession> {
    let token = token?;
    match state.auth.resolve(token).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "session lookup failed");
            None
        }
    }
}

/// Stores a [`CurrentSession`] in the request extensions.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(&jar, request.headers());
    let session = resolve_session(&state, token.as_deref()).await;
    request.extensions_mut().insert(CurrentSession(session));
    next.run(request).await
}
