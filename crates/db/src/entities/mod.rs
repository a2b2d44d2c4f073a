//! `SeaORM` entity definitions.

pub mod accounts;
pub mod files;
pub mod items;
pub mod sessions;
pub mod users;

pub mod prelude {
    //! Entity re-exports.
    pub use super::accounts::Entity as Accounts;
    pub use super::files::Entity as Files;
    pub use super::items::Entity as Items;
    pub use super::sessions::Entity as Sessions;
    pub use super::users::Entity as Users;
}
