//! API route definitions.

pub mod auth;
pub mod files;
pub mod health;
pub mod items;
pub mod root;
