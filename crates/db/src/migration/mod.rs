//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_auth;
mod m20260301_000002_items;
mod m20260301_000003_files;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_auth::Migration),
            Box::new(m20260301_000002_items::Migration),
            Box::new(m20260301_000003_files::Migration),
        ]
    }
}
