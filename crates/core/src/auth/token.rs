//! Opaque session tokens.
//!
//! Clients hold the raw token; only its SHA-256 hex digest is persisted.

use sha2::{Digest, Sha256};

/// Generate a new session token: 32 random bytes, base64url encoded.
#[must_use]
pub fn generate_session_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64_url::encode(&bytes)
}

/// Hash a session token for storage and lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
