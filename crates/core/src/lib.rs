//! Bookstore Core - Shared types library.
//!
//! This crate provides common types used across all bookstore components:
//! - `server` - REST API for the catalog, carts, orders and complaints
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, quantities,
//!   emails, roles and statuses
//! - [`placement`] - Order placement planning (stock checks and totals)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod placement;
pub mod types;

pub use placement::{
    BookStock, LineSource, MAX_ORDER_TOTAL, PlacementError, PlacementPlan, PlannedLine,
    RequestedLine, plan_placement,
};
pub use types::*;
