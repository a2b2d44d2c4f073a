//! Application-wide error types.

use serde_json::Value;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request data failed schema validation.
    #[error("Validation error: {message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Per-field errors.
        details: Option<Value>,
    },

    /// Malformed request with an endpoint-specific code.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error code, e.g. `MISSING_FILE`.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Authentication required.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Email/password pair rejected.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Access denied.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Endpoint-specific code, e.g. `FILE_NOT_FOUND`.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Extra context for the client.
        details: Option<Value>,
    },

    /// Conflict (e.g., duplicate entry).
    #[error("Conflict: {message}")]
    Conflict {
        /// Error code, e.g. `USER_ALREADY_EXISTS`.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Framework-level rejection with a pass-through status.
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Rejection message.
        message: String,
    },

    /// Feature backed by a service that is not configured.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Blob storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// Attaches client-facing details to a not found error.
    #[must_use]
    pub fn with_details(self, value: Value) -> Self {
        match self {
            Self::NotFound { code, message, .. } => Self::NotFound {
                code,
                message,
                details: Some(value),
            },
            Self::Validation { message, .. } => Self::Validation {
                message,
                details: Some(value),
            },
            other => other,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::BadRequest { .. } => 400,
            Self::Unauthorized(_) | Self::InvalidCredentials => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Http { status, .. } => *status,
            Self::NotConfigured(_) => 501,
            Self::Database(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::BadRequest { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. } => *code,
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Http { .. } => "HTTP_ERROR",
            Self::NotConfigured(_) => "NOT_CONFIGURED",
            Self::Database(_) | Self::Storage(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true for errors caused by the server rather than the client.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Returns the message safe to send to clients.
    ///
    /// Server-side failures never leak their cause.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation { message, .. }
            | Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::Http { message, .. }
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotConfigured(message) => message.clone(),
            Self::InvalidCredentials => self.to_string(),
            Self::Database(_) | Self::Storage(_) | Self::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }

    /// Returns client-facing details, if any.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Validation { details, .. } | Self::NotFound { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}
