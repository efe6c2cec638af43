//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bookstore-cli migrate
//! ```
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time.

use super::{ConnectError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the connection or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
