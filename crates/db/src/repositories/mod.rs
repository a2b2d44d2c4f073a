//! Repository implementations of the core persistence traits.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod auth;
pub mod file;
pub mod item;

pub use auth::AuthRepository;
pub use file::FileRepository;
pub use item::ItemRepository;
