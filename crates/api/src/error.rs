//! Conversion of application errors into HTTP responses.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{BytesRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::response::{Envelope, ErrorBody};
use tidepool_core::auth::AuthError;
use tidepool_core::files::FileError;
use tidepool_core::items::ItemError;
use tidepool_core::storage::StorageError;
use tidepool_shared::AppError;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An [`AppError`] on its way to becoming an error envelope.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// The wrapped application error.
    #[must_use]
    pub fn inner(&self) -> &AppError {
        &self.0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_server_error() {
            error!(code = err.error_code(), status = status.as_u16(), error = %err, "request failed");
        } else {
            warn!(
                code = err.error_code(),
                status = status.as_u16(),
                message = %err.client_message(),
                "request rejected"
            );
        }

        let body = Envelope::error(ErrorBody {
            code: err.error_code(),
            message: err.client_message(),
            details: err.details().cloned(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        Self(err.into())
    }
}

impl From<ItemError> for ApiError {
    fn from(err: ItemError) -> Self {
        Self(err.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self(err.into())
    }
}

fn passthrough(status: StatusCode, message: String) -> ApiError {
    ApiError(AppError::Http {
        status: status.as_u16(),
        message,
    })
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                Self(AppError::validation(e.body_text(), None))
            }
            other => passthrough(other.status(), other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(e) => Self(AppError::validation(
                "Invalid path parameter",
                Some(json!({ "path": [e.body_text()] })),
            )),
            other => passthrough(other.status(), other.body_text()),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        passthrough(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        passthrough(err.status(), err.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        passthrough(rejection.status(), rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self(AppError::validation(
            "Request validation failed",
            Some(validation_details(&errors)),
        ))
    }
}

/// Per-field messages: `{ "name": ["length"], ... }`.
fn validation_details(errors: &ValidationErrors) -> Value {
    let mut fields = Map::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map_or_else(|| e.code.to_string(), ToString::to_string)
            })
            .map(Value::String)
            .collect();
        fields.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(fields)
}
