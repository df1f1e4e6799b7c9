//! Database migrations for the build-and-deploy pipeline.

pub use sea_orm_migration::prelude::*;

mod migration;
pub use migration::Migrator;
