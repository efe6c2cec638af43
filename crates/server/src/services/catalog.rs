//! Catalog service.
//!
//! Validates book input before it reaches the store. Prices are rounded to
//! cents and capped at [`Price::MAX`] to match the `NUMERIC(10,2)` column.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use bookstore_core::{BookId, Price};

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Book, BookUpdate, NewBook};

/// Book fields as submitted by an admin.
///
/// Used for both create (where title, author, price and category are
/// required) and partial update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Catalog operations.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// All books, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list(&self) -> Result<Vec<Book>> {
        Ok(self.store.list_books().await?)
    }

    /// A single book.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the book doesn't exist.
    pub async fn get(&self, id: BookId) -> Result<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book {id} not found")))
    }

    /// Add a book to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if a required field is missing or a
    /// value is out of range.
    #[instrument(skip_all)]
    pub async fn create(&self, input: BookInput) -> Result<Book> {
        let book = NewBook {
            title: required_text("title", input.title)?,
            author: required_text("author", input.author)?,
            price: price(
                input
                    .price
                    .ok_or_else(|| AppError::InvalidInput("price is required".to_string()))?,
            )?,
            stock: input.stock.map_or(Ok(0), stock)?,
            category: required_text("category", input.category)?,
            description: optional_text(input.description),
            image: optional_text(input.image),
        };

        let book = self.store.create_book(book).await?;
        tracing::info!(book_id = %book.id, "Book added");
        Ok(book)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for an empty update or a bad value.
    /// Returns `AppError::NotFound` if the book doesn't exist.
    #[instrument(skip(self, input), fields(book_id = %id))]
    pub async fn update(&self, id: BookId, input: BookInput) -> Result<Book> {
        let update = BookUpdate {
            title: input.title.map(|t| present_text("title", t)).transpose()?,
            author: input.author.map(|a| present_text("author", a)).transpose()?,
            price: input.price.map(price).transpose()?,
            stock: input.stock.map(stock).transpose()?,
            category: input
                .category
                .map(|c| present_text("category", c))
                .transpose()?,
            description: input.description.map(|d| d.trim().to_owned()),
            image: input.image.map(|i| i.trim().to_owned()),
        };

        if update.is_empty() {
            return Err(AppError::InvalidInput("no fields to update".to_string()));
        }

        self.store
            .update_book(id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book {id} not found")))
    }

    /// Remove a book. Existing orders keep their reference to it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the book doesn't exist.
    #[instrument(skip(self), fields(book_id = %id))]
    pub async fn delete(&self, id: BookId) -> Result<()> {
        if !self.store.delete_book(id).await? {
            return Err(AppError::NotFound(format!("book {id} not found")));
        }
        tracing::info!("Book deleted");
        Ok(())
    }
}

fn present_text(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_owned())
}

fn required_text(field: &str, value: Option<String>) -> Result<String> {
    value.map_or_else(
        || Err(AppError::InvalidInput(format!("{field} is required"))),
        |v| present_text(field, v),
    )
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn price(amount: Decimal) -> Result<Price> {
    let mut cents = amount.round_dp(2);
    cents.rescale(2);
    Price::new(cents).map_err(|e| AppError::InvalidInput(e.to_string()))
}

fn stock(value: i64) -> Result<i32> {
    i32::try_from(value)
        .ok()
        .filter(|s| *s >= 0)
        .ok_or_else(|| AppError::InvalidInput(format!("stock must be a non-negative integer (got {value})")))
}
