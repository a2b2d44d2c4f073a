//! Items: a minimal owned CRUD resource.

mod error;
mod types;

pub use error::ItemError;
pub use types::{Item, ItemChanges, ItemRepository, NewItem};
