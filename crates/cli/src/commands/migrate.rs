//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! storekeep migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string (fallback: `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Order migrations: `crates/orders/migrations/`

use storekeep_orders::config::{ConfigError, OrdersConfig};
use storekeep_orders::db;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the order database migrations.
///
/// # Errors
///
/// Returns an error if no database URL is configured, the connection fails,
/// or a migration fails.
pub async fn run(config: &OrdersConfig) -> Result<(), MigrationError> {
    let database_url = config.require_database_url()?;

    tracing::info!("Connecting to orders database...");
    let pool = db::create_pool(database_url).await?;

    tracing::info!("Running orders migrations...");
    sqlx::migrate!("../orders/migrations").run(&pool).await?;

    tracing::info!("Orders migrations complete!");
    Ok(())
}
