//! Business logic services.
//!
//! Each service borrows the [`Store`](crate::db::Store) for the duration of
//! a request and is constructed by the handler that needs it.
//!
//! # Services
//!
//! - `auth` - Registration, login and bearer tokens
//! - `catalog` - Book validation and CRUD
//! - `cart` - Per-user cart
//! - `orders` - Order placement and lookup
//! - `complaints` - Complaint submission and admin workflow

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod complaints;
pub mod orders;

pub use cart::CartService;
pub use catalog::{BookInput, CatalogService};
pub use complaints::{ComplaintInput, ComplaintService, ComplaintUpdateInput};
pub use orders::{ManualLine, ManualOrder, OrderService};

use bookstore_core::UserId;

use crate::db::Store;
use crate::error::{AppError, Result};

/// Fail with `NotFound` when a token outlives the account it names.
pub(crate) async fn require_account(store: &dyn Store, user: UserId) -> Result<()> {
    if store.user_by_id(user).await?.is_none() {
        tracing::warn!(user_id = %user, "Token names a missing account");
        return Err(AppError::NotFound(format!("user {user} not found")));
    }
    Ok(())
}
