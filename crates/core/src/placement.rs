//! Order placement planning.
//!
//! [`plan_placement`] is the pure half of placing an order: given the
//! requested lines and a snapshot of the books they reference, it either
//! rejects the order or produces the priced lines and total that the store
//! then persists. Stores call it while holding their lock (or row locks), so
//! the snapshot it sees is the one that gets committed.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::{BookId, Price, Quantity};

/// Where the requested lines came from.
///
/// Only affects how a missing book is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    /// Lines are the user's stored cart.
    Cart,
    /// Lines were submitted explicitly with the request.
    Manual,
}

/// One requested line: a book and how many copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub book: BookId,
    pub quantity: Quantity,
}

/// The fields of a book that placement needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookStock {
    pub id: BookId,
    pub title: String,
    pub price: Price,
    pub stock: i32,
}

/// A validated, priced order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLine {
    pub book: BookId,
    pub quantity: Quantity,
    /// Price captured at placement; later price changes don't affect the order.
    pub unit_price: Price,
}

/// Result of a successful plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Decimal,
}

/// Reasons an order cannot be placed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("cart is empty")]
    EmptyCart,

    /// A cart entry points at a book that has since been deleted.
    #[error("book {book} in the cart no longer exists")]
    DanglingReference { book: BookId },

    /// A manually submitted line names a book that doesn't exist.
    #[error("book {book} not found")]
    UnknownBook { book: BookId },

    /// `requested` sums every line for the book, so it can exceed `i32`.
    #[error("insufficient stock for \"{title}\": {available} available, {requested} requested")]
    InsufficientStock {
        book: BookId,
        title: String,
        available: i32,
        requested: i64,
    },

    #[error("order total exceeds {max}", max = MAX_ORDER_TOTAL)]
    TotalTooLarge,
}

/// Largest storable order total, 9,999,999,999.99 (`NUMERIC(12,2)`).
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Validate `lines` against `books` and price them.
///
/// Lines for the same book are combined (first-seen order) before the stock
/// check, so the plan never takes more copies of a book than it has. Books
/// are checked in order and the first failure is returned.
///
/// # Errors
///
/// - `EmptyCart` if there are no lines
/// - `DanglingReference` / `UnknownBook` if a book is missing (per `source`)
/// - `InsufficientStock` if a book has fewer copies than requested
/// - `TotalTooLarge` if the total does not fit [`MAX_ORDER_TOTAL`]
pub fn plan_placement(
    source: LineSource,
    lines: &[RequestedLine],
    books: &HashMap<BookId, BookStock>,
) -> Result<PlacementPlan, PlacementError> {
    if lines.is_empty() {
        return Err(PlacementError::EmptyCart);
    }

    let mut requested: Vec<(BookId, i64)> = Vec::with_capacity(lines.len());
    for line in lines {
        let quantity = i64::from(line.quantity.get());
        match requested.iter_mut().find(|(book, _)| *book == line.book) {
            Some((_, total)) => *total += quantity,
            None => requested.push((line.book, quantity)),
        }
    }

    let mut planned = Vec::with_capacity(requested.len());
    let mut total = Decimal::ZERO;

    for (id, wanted) in requested {
        let Some(book) = books.get(&id) else {
            return Err(match source {
                LineSource::Cart => PlacementError::DanglingReference { book: id },
                LineSource::Manual => PlacementError::UnknownBook { book: id },
            });
        };

        let insufficient = || PlacementError::InsufficientStock {
            book: book.id,
            title: book.title.clone(),
            available: book.stock,
            requested: wanted,
        };
        if i64::from(book.stock) < wanted {
            return Err(insufficient());
        }
        let quantity = Quantity::new(wanted).map_err(|_| insufficient())?;

        total = book
            .price
            .line_total(quantity)
            .and_then(|line_total| total.checked_add(line_total))
            .filter(|sum| *sum <= MAX_ORDER_TOTAL)
            .ok_or(PlacementError::TotalTooLarge)?;
        planned.push(PlannedLine {
            book: book.id,
            quantity,
            unit_price: book.price,
        });
    }

    Ok(PlacementPlan {
        lines: planned,
        total,
    })
}
