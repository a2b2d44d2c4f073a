//! Response envelope.
//!
//! Every API body has the shape
//! `{ success, data?, error?: { code, message, details? }, meta: { requestId, timestamp } }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::middleware::current_request_id;

/// Per-response metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// `X-Request-Id` of the request being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp with millisecond precision.
    pub timestamp: String,
}

impl Meta {
    /// Metadata for the request currently in flight.
    #[must_use]
    pub fn now() -> Self {
        Self {
            request_id: current_request_id(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Error section of the envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `FILE_NOT_FOUND`.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Extra context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// The JSON envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// True for 2xx responses.
    pub success: bool,
    /// Payload of successful responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error of failed responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    /// Request metadata.
    pub meta: Meta,
}

impl<T> Envelope<T> {
    /// Successful envelope.
    #[must_use]
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Meta::now(),
        }
    }
}

impl Envelope<()> {
    /// Failed envelope.
    #[must_use]
    pub fn error(error: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            meta: Meta::now(),
        }
    }
}

/// Successful response with a status code.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    /// 201 Created.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::data(self.data))).into_response()
    }
}
