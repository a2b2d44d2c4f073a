//! Shared errors and configuration for Tidepool.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error taxonomy mapped onto HTTP status codes
//! - Layered configuration management

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
