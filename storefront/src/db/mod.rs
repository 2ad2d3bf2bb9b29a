// storefront/src/db/mod.rs

pub mod seed;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub async fn connect(config: &AppConfig) -> Result<PgPool> {
  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .connect(&config.database_url)
    .await?;
  info!(max_connections = config.database_max_connections, "Connected to the database.");
  Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
  sqlx::migrate!("./migrations")
    .run(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Database migration failed: {}", e)))?;
  info!("Database migrations applied.");
  Ok(())
}

/// True when `err` is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}
