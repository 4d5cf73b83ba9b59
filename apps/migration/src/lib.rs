//! Schema migrations for the Inkpost database.

pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_users;
mod m20260101_000002_create_posts;
mod m20260101_000003_create_saved_posts;
mod m20260101_000004_create_comments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_users::Migration),
            Box::new(m20260101_000002_create_posts::Migration),
            Box::new(m20260101_000003_create_saved_posts::Migration),
            Box::new(m20260101_000004_create_comments::Migration),
        ]
    }
}
