//! Service index.

use axum::Json;
use serde_json::{Value, json};

/// `GET /`: name, version and the top-level endpoint map.
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "Tidepool API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "auth": "/api/auth",
            "items": "/api/items",
            "files": "/api/files",
        }
    }))
}
