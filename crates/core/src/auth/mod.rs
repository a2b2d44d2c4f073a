//! Authentication.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Opaque session tokens stored as SHA-256 digests
//! - Email/password sign-up and sign-in with sliding session expiry

mod error;
mod password;
mod service;
mod token;
mod types;

pub use error::AuthError;
pub use password::{
    MAX_PASSWORD_LEN, MIN_PASSWORD_LEN, PasswordError, hash_password, hash_password_async,
    verify_password, verify_password_async,
};
pub use service::{AuthRepository, AuthService, MAX_SESSION_SECS, SessionPolicy};
pub use token::{generate_session_token, hash_token};
pub use types::{
    AuthSession, ClientInfo, Credential, IssuedSession, NewSession, NewUser, Session, SignInInput,
    SignUpInput, User, normalize_email,
};
