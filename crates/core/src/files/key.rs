//! Storage key generation.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::storage::SIDECAR_SUFFIX;

const UPLOAD_PREFIX: &str = "uploads";

static LAST_ISSUED_MS: AtomicI64 = AtomicI64::new(0);

/// Current epoch millis, bumped past the last issued value so that every call
/// in this process returns a distinct, increasing stamp.
fn unique_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ISSUED_MS.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_ISSUED_MS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Key for a new upload: `uploads/<millis>-<sanitized filename>`.
///
/// A name ending in the sidecar suffix gets its last dot replaced, so the
/// key is accepted by every backend: `report.meta.json` becomes
/// `report.meta_json`.
#[must_use]
pub fn upload_key(filename: &str) -> String {
    let mut name = sanitize_filename(filename);
    if name.ends_with(SIDECAR_SUFFIX) {
        let dot = name.len() - ".json".len();
        name.replace_range(dot..=dot, "_");
    }
    format!("{UPLOAD_PREFIX}/{}-{name}", unique_millis())
}

/// Filename used for raw-body uploads without an `X-Filename` header.
#[must_use]
pub fn default_filename() -> String {
    format!("file-{}", Utc::now().timestamp_millis())
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
/// Everything else, path separators included, becomes `_`.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}
