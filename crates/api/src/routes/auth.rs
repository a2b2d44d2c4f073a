//! Email/password authentication with cookie sessions.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, header::USER_AGENT},
    routing::{get, post},
};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use cookie::time::Duration as CookieDuration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    AppState,
    error::ApiResult,
    extractors::ValidatedJson,
    middleware::{SESSION_COOKIE, resolve_session, session_token},
    response::ApiResponse,
};
use tidepool_core::auth::{
    AuthSession, ClientInfo, MAX_SESSION_SECS, Session, SignInInput, SignUpInput,
};
use tidepool_shared::AppError;

/// Creates the auth router, mounted at `/api/auth`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up/email", post(sign_up))
        .route("/sign-in/email", post(sign_in))
        .route("/get-session", get(get_session))
        .route("/list-sessions", get(list_sessions))
        .route("/sign-out", post(sign_out))
}

/// Body of `POST /api/auth/sign-up/email`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Plaintext password.
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
}

/// Body of `POST /api/auth/sign-in/email`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Plaintext password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Body of `POST /api/auth/sign-out`.
#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    /// Always true.
    pub success: bool,
}

fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| header("x-real-ip"))
        .map(str::to_owned);
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    ClientInfo {
        ip_address,
        user_agent,
    }
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let secs = state.config.auth.session_expires_secs.min(MAX_SESSION_SECS);
    let max_age = i64::try_from(secs).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age))
        .build()
}

async fn sign_up(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<SignUpRequest>,
) -> ApiResult<(SignedCookieJar, ApiResponse<AuthSession>)> {
    let issued = state
        .auth
        .sign_up(
            SignUpInput {
                name: body.name,
                email: body.email,
                password: body.password,
            },
            client_info(&headers),
        )
        .await?;
    let jar = jar.add(session_cookie(&state, issued.token));
    Ok((jar, ApiResponse::ok(issued.auth)))
}

async fn sign_in(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<SignInRequest>,
) -> ApiResult<(SignedCookieJar, ApiResponse<AuthSession>)> {
    let issued = state
        .auth
        .sign_in(
            SignInInput {
                email: body.email,
                password: body.password,
            },
            client_info(&headers),
        )
        .await?;
    let jar = jar.add(session_cookie(&state, issued.token));
    Ok((jar, ApiResponse::ok(issued.auth)))
}

async fn get_session(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
) -> ApiResponse<Option<AuthSession>> {
    let token = session_token(&jar, &headers);
    ApiResponse::ok(resolve_session(&state, token.as_deref()).await)
}

fn unauthenticated() -> AppError {
    AppError::Unauthorized("Authentication required".to_string())
}

async fn list_sessions(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
) -> ApiResult<ApiResponse<Vec<Session>>> {
    let token = session_token(&jar, &headers);
    let auth = resolve_session(&state, token.as_deref())
        .await
        .ok_or_else(unauthenticated)?;
    let sessions = state.auth.list_sessions(auth.user.id).await?;
    Ok(ApiResponse::ok(sessions))
}

async fn sign_out(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
) -> ApiResult<(SignedCookieJar, ApiResponse<SignOutResponse>)> {
    let token = session_token(&jar, &headers).ok_or_else(unauthenticated)?;
    if resolve_session(&state, Some(&token)).await.is_none() {
        return Err(unauthenticated().into());
    }
    state.auth.sign_out(&token).await?;

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok((jar, ApiResponse::ok(SignOutResponse { success: true })))
}
