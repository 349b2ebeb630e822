pub mod progress;

#[cfg(test)]
pub mod memory;

pub use progress::{PgProgressStore, ProgressStore};

use crate::config::Config;
use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

pub type DB = PgPool;

/// Opens the Postgres pool and makes sure the schema exists.
pub async fn connect(config: &Config) -> Result<DB> {
    // 1. Connect
    // A short acquire timeout so a dead database turns into a 500 quickly
    // instead of piling up requests.
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("Could not connect to DATABASE_URL")?;

    // 2. Create the table
    init_schema(&db).await?;

    Ok(db)
}

/// Idempotent, safe to run on every boot.
pub async fn init_schema(db: &DB) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_progress (
            user_id BIGINT PRIMARY KEY,
            score INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1,
            last_updated TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(db)
    .await
    .context("Could not create user_progress table")?;

    tracing::info!("Database schema ready");
    Ok(())
}
