//! Auth domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email, lowercased.
    pub email: String,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// Avatar URL.
    pub image: Option<String>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A login session. The token itself is never part of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session ID.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// Client IP at sign-in.
    pub ip_address: Option<String>,
    /// Client user agent at sign-in.
    pub user_agent: Option<String>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Returns true if the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A resolved session with its user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Signed-in user.
    pub user: User,
    /// Active session.
    pub session: Session,
}

/// A freshly opened session plus the raw token to hand to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Session and user.
    pub auth: AuthSession,
    /// Raw token, shown once.
    pub token: String,
}

/// Client metadata recorded on new sessions.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// Input for email/password sign-up.
#[derive(Debug, Clone)]
pub struct SignUpInput {
    /// Display name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Input for email/password sign-in.
#[derive(Debug, Clone)]
pub struct SignInInput {
    /// Email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Input for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email, already normalized.
    pub email: String,
}

/// Input for inserting a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Owning user.
    pub user_id: Uuid,
    /// SHA-256 hex of the raw token.
    pub token_hash: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// Client metadata.
    pub client: ClientInfo,
}

/// A user together with the password hash of their credential account.
#[derive(Debug, Clone)]
pub struct Credential {
    /// The user.
    pub user: User,
    /// Argon2id PHC string.
    pub password_hash: String,
}

/// Normalize an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
