//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by commands that need the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: BOOKSTORE_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `BOOKSTORE_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConnectError` if neither variable is set or the connection fails.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BOOKSTORE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    Ok(bookstore_server::db::create_pool(&database_url).await?)
}
