//! Catalog book types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstore_core::{BookId, BookStock, Price};

/// Title reported for order lines and cart entries whose book was deleted.
pub const MISSING_BOOK_TITLE: &str = "Book not found";

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub price: Price,
    /// Sellable copies; never negative.
    pub stock: i32,
    pub category: String,
    pub description: Option<String>,
    /// Plain URL; images are not stored by the API.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// The fields order placement checks and prices against.
    #[must_use]
    pub fn stock_level(&self) -> BookStock {
        BookStock {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            stock: self.stock,
        }
    }
}

/// Validated input for a new catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub price: Price,
    pub stock: i32,
    pub category: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Validated partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl BookUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the update in place.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title.clone_from(title);
        }
        if let Some(author) = &self.author {
            book.author.clone_from(author);
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(stock) = self.stock {
            book.stock = stock;
        }
        if let Some(category) = &self.category {
            book.category.clone_from(category);
        }
        if let Some(description) = &self.description {
            book.description = Some(description.clone());
        }
        if let Some(image) = &self.image {
            book.image = Some(image.clone());
        }
    }
}

/// Placeholder for a referenced book that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingBook {
    pub id: BookId,
    pub title: &'static str,
    pub missing: bool,
}

/// A book as seen from a cart entry or order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BookRef {
    Found(Book),
    Missing(MissingBook),
}

impl BookRef {
    /// Look `id` up in `books`, falling back to the placeholder.
    #[must_use]
    pub fn resolve(id: BookId, books: &HashMap<BookId, Book>) -> Self {
        books.get(&id).map_or_else(
            || {
                Self::Missing(MissingBook {
                    id,
                    title: MISSING_BOOK_TITLE,
                    missing: true,
                })
            },
            |book| Self::Found(book.clone()),
        )
    }

    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}
