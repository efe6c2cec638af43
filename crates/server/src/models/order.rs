//! Order ledger types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bookstore_core::{BookId, OrderId, OrderStatus, Price, Quantity, RequestedLine, UserId};

use super::{BookRef, UserSummary};

/// Which lines an order is placed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSource {
    /// The caller's stored cart, which is cleared on success.
    Cart,
    /// An explicit line list; repeated books are combined. The cart is not touched.
    Manual(Vec<RequestedLine>),
}

/// A persisted order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub book: BookId,
    pub quantity: Quantity,
    pub unit_price: Price,
}

/// An order as stored, with line items referencing books by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    /// Computed once at placement.
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

/// An order line resolved against the current catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub book: BookRef,
    pub quantity: Quantity,
    pub unit_price: Price,
}

/// An order as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Present in admin listings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    pub books: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}
