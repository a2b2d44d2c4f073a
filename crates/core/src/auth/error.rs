//! Auth error types.

use thiserror::Error;
use tidepool_shared::AppError;

use super::PasswordError;

/// Auth operation errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email already registered.
    #[error("email already registered")]
    EmailTaken,

    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// No valid session for the request.
    #[error("no active session")]
    Unauthenticated,

    /// Password hashing failed.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailTaken => Self::conflict("USER_ALREADY_EXISTS", "User already exists"),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Unauthenticated => Self::Unauthorized("Authentication required".to_string()),
            AuthError::Password(e) => Self::Internal(e.to_string()),
            AuthError::Repository(msg) => Self::Database(msg),
        }
    }
}
