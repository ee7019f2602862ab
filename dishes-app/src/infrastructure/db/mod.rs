pub mod entities;
mod dish_repository;

pub use dish_repository::DishRepository;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::time::Duration;

pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opt).await
}

pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let migration = include_str!("../../../migrations/001_dishes.sql");

    // Every statement is idempotent (IF NOT EXISTS), so this runs on each start.
    for statement in migration.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            db.execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                statement.to_string(),
            ))
            .await?;
        }
    }

    tracing::info!("dishes schema is up to date");
    Ok(())
}
