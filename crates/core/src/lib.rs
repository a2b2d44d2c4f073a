//! Core business logic for Tidepool.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached through repository traits implemented by `tidepool-db`.
//!
//! # Modules
//!
//! - `storage` - Blob storage contract with local and bucket backends
//! - `files` - Upload bookkeeping across storage and metadata
//! - `items` - Item domain types
//! - `auth` - Password hashing, session tokens, sign-in

pub mod auth;
pub mod files;
pub mod items;
pub mod storage;
