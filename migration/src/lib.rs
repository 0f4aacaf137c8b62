//! Database migrations for the rental review service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_11_10_090000_create_user_profiles;
mod m2025_11_10_090100_create_ratable_entities;
mod m2025_11_10_090200_create_reviews;
mod m2025_11_10_090300_create_review_votes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_11_10_090000_create_user_profiles::Migration),
            Box::new(m2025_11_10_090100_create_ratable_entities::Migration),
            Box::new(m2025_11_10_090200_create_reviews::Migration),
            Box::new(m2025_11_10_090300_create_review_votes::Migration),
        ]
    }
}
