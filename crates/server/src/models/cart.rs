//! Shopping cart types.

use serde::Serialize;

use bookstore_core::{BookId, Quantity, RequestedLine};

use super::BookRef;

/// One stored cart entry. A cart holds at most one entry per book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub book: BookId,
    pub quantity: Quantity,
}

impl From<CartItem> for RequestedLine {
    fn from(item: CartItem) -> Self {
        Self {
            book: item.book,
            quantity: item.quantity,
        }
    }
}

/// A cart entry joined with the current book data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub book: BookRef,
    pub quantity: Quantity,
}

/// The caller's cart as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart: Vec<CartLine>,
    /// Sum of quantities across all entries.
    pub total_items: i64,
}

impl CartView {
    #[must_use]
    pub fn new(cart: Vec<CartLine>) -> Self {
        let total_items = cart.iter().map(|line| i64::from(line.quantity.get())).sum();
        Self { cart, total_items }
    }
}
