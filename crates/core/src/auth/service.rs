//! Email/password auth with database-backed sessions.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tidepool_shared::config::AuthConfig;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::AuthError;
use super::password::{hash_password_async, verify_password_async};
use super::token::{generate_session_token, hash_token};
use super::types::{
    AuthSession, ClientInfo, Credential, IssuedSession, NewSession, NewUser, Session, SignInInput,
    SignUpInput, User, normalize_email,
};

/// Repository trait for users, credential accounts and sessions.
///
/// This trait is implemented by the db crate to provide actual database operations.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Find a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Find a user and their credential password hash by normalized email.
    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AuthError>;

    /// Insert a user and their credential account.
    ///
    /// Returns `EmailTaken` if the email is already registered.
    async fn create_user(&self, user: NewUser, password_hash: String) -> Result<User, AuthError>;

    /// Insert a session.
    async fn create_session(&self, input: NewSession) -> Result<Session, AuthError>;

    /// Find a session and its user by token hash.
    async fn find_session(&self, token_hash: &str) -> Result<Option<AuthSession>, AuthError>;

    /// Move a session's expiry.
    async fn extend_session(
        &self,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Delete a session by token hash, returning whether it existed.
    async fn delete_session(&self, token_hash: &str) -> Result<bool, AuthError>;

    /// Unexpired sessions of a user, newest first.
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError>;
}

/// Longest configurable session lifetime or update age, 100 years.
///
/// Larger values would overflow `DateTime` arithmetic on every sign-in.
pub const MAX_SESSION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Session lifetime rules.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Lifetime of a new or refreshed session.
    pub expires_in: Duration,
    /// Age after which resolving a session pushes its expiry out.
    pub update_age: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            expires_in: Duration::days(7),
            update_age: Duration::days(1),
        }
    }
}

impl SessionPolicy {
    /// Policy from the auth configuration section, clamped to
    /// [`MAX_SESSION_SECS`].
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let secs = |v: u64| {
            Duration::seconds(i64::try_from(v.min(MAX_SESSION_SECS)).unwrap_or(i64::MAX / 1000))
        };
        Self {
            expires_in: secs(config.session_expires_secs),
            update_age: secs(config.session_update_age_secs),
        }
    }

    /// A session was last refreshed `expires_in - (expires_at - now)` ago.
    fn needs_refresh(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.expires_at - self.expires_in + self.update_age <= now
    }
}

/// Sign-up, sign-in and session resolution.
pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    policy: SessionPolicy,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub fn new(repo: Arc<dyn AuthRepository>, policy: SessionPolicy) -> Self {
        Self { repo, policy }
    }

    /// Register a user with a password and open their first session.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken` if the email is registered, or a repository or
    /// hashing error.
    pub async fn sign_up(
        &self,
        input: SignUpInput,
        client: ClientInfo,
    ) -> Result<IssuedSession, AuthError> {
        let email = normalize_email(&input.email);
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password_async(input.password).await?;
        let user = self
            .repo
            .create_user(
                NewUser {
                    name: input.name.trim().to_string(),
                    email,
                },
                password_hash,
            )
            .await?;

        info!(user_id = %user.id, "user signed up");
        self.open_session(user, client).await
    }

    /// Verify email and password and open a session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email or wrong password.
    pub async fn sign_in(
        &self,
        input: SignInInput,
        client: ClientInfo,
    ) -> Result<IssuedSession, AuthError> {
        let email = normalize_email(&input.email);
        let Some(credential) = self.repo.find_credential(&email).await? else {
            debug!("sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_async(input.password, credential.password_hash).await? {
            debug!(user_id = %credential.user.id, "sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %credential.user.id, "user signed in");
        self.open_session(credential.user, client).await
    }

    async fn open_session(
        &self,
        user: User,
        client: ClientInfo,
    ) -> Result<IssuedSession, AuthError> {
        let token = generate_session_token();
        let session = self
            .repo
            .create_session(NewSession {
                user_id: user.id,
                token_hash: hash_token(&token),
                expires_at: Utc::now() + self.policy.expires_in,
                client,
            })
            .await?;

        Ok(IssuedSession {
            auth: AuthSession { user, session },
            token,
        })
    }

    /// Resolve a raw token to its session.
    ///
    /// Expired sessions are deleted and resolve to `None`. Sessions older
    /// than the update age get their expiry extended.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn resolve(&self, token: &str) -> Result<Option<AuthSession>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        let token_hash = hash_token(token);
        let Some(mut auth) = self.repo.find_session(&token_hash).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if auth.session.is_expired(now) {
            self.repo.delete_session(&token_hash).await?;
            debug!(session_id = %auth.session.id, "expired session removed");
            return Ok(None);
        }

        if self.policy.needs_refresh(&auth.session, now) {
            let expires_at = now + self.policy.expires_in;
            self.repo
                .extend_session(auth.session.id, expires_at)
                .await?;
            auth.session.expires_at = expires_at;
            auth.session.updated_at = now;
        }

        Ok(Some(auth))
    }

    /// Delete the session behind a raw token.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn sign_out(&self, token: &str) -> Result<bool, AuthError> {
        self.repo.delete_session(&hash_token(token)).await
    }

    /// Active sessions of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError> {
        self.repo.list_sessions(user_id).await
    }
}
