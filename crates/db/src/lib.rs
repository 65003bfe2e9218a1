//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for scenarios and their inputs
//! - Repositories that enforce the scenario lifecycle
//! - Conversions between stored rows and projection engine types
//! - Database migrations

pub mod convert;
pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    ActualRepository, CostItemRepository, CreditLineRepository, ProjectionRepository,
    SalesUnitRepository, ScenarioRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection with explicit pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with_pool(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    tracing::debug!(max_connections, min_connections, "Connecting to database");
    Database::connect(options).await
}
