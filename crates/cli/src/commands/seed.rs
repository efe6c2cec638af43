//! Catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! bookstore-cli seed books catalog.json
//! ```
//!
//! The file holds a JSON array of books in the same shape the
//! `/admin/addBook` route accepts:
//!
//! ```json
//! [{"title": "Dune", "author": "Frank Herbert", "price": "12.50", "stock": 4, "category": "fiction"}]
//! ```

use std::path::Path;

use thiserror::Error;

use bookstore_server::db::PgStore;
use bookstore_server::error::AppError;
use bookstore_server::services::{BookInput, CatalogService};

use super::{ConnectError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Book #{index} rejected: {source}")]
    Book { index: usize, source: AppError },
}

/// Insert every book in `file`. Stops at the first invalid entry.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, or a book is
/// rejected by catalog validation.
pub async fn books(file: &str) -> Result<usize, SeedError> {
    let raw = std::fs::read_to_string(Path::new(file)).map_err(|source| SeedError::Read {
        path: file.to_owned(),
        source,
    })?;
    let inputs = parse(&raw)?;

    let store = PgStore::new(connect().await?);
    let catalog = CatalogService::new(&store);

    let count = inputs.len();
    for (index, input) in inputs.into_iter().enumerate() {
        let book = catalog
            .create(input)
            .await
            .map_err(|source| SeedError::Book { index, source })?;
        tracing::info!(book_id = %book.id, title = %book.title, "Seeded book");
    }

    tracing::info!("Seeded {} books", count);
    Ok(count)
}

fn parse(raw: &str) -> Result<Vec<BookInput>, SeedError> {
    Ok(serde_json::from_str(raw)?)
}
