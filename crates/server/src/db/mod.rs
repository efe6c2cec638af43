//! Storage for the bookstore.
//!
//! # Database
//!
//! ## Tables
//!
//! - `app_user` - Accounts (at most one `admin`, enforced by a partial unique index)
//! - `book` - Catalog
//! - `cart_item` - One row per (user, book); `id` order is insertion order
//! - `customer_order` / `order_item` - Order ledger with unit prices captured at placement
//! - `complaint` - Feedback and complaints with the admin response workflow
//!
//! `cart_item.book_id` and `order_item.book_id` deliberately carry no foreign
//! key: deleting a book leaves dangling references that read back as a
//! "Book not found" placeholder.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bookstore-cli -- migrate
//! ```
//!
//! # Store seam
//!
//! Handlers talk to [`Store`], not to `sqlx` directly. [`PgStore`] is the
//! production implementation; [`MemoryStore`] keeps everything behind one
//! mutex and backs the test suites.

mod books;
mod carts;
mod complaints;
pub mod memory;
mod orders;
mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bookstore_core::{
    BookId, ComplaintId, Email, OrderId, OrderStatus, PlacementError, Quantity, UserId,
};

use crate::models::{
    Book, BookUpdate, CartItem, Complaint, ComplaintFilter, ComplaintStats, ComplaintUpdate,
    NewBook, NewComplaint, NewUser, OrderRecord, OrderSource, User,
};

pub use books::BookRepository;
pub use carts::CartRepository;
pub use complaints::ComplaintRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use users::UserRepository;

/// Conflict message when an email is already registered.
pub const EMAIL_TAKEN: &str = "email already exists";
/// Conflict message when a second admin is created.
pub const ADMIN_TAKEN: &str = "an admin account already exists";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store itself failed (e.g. a poisoned lock).
    #[error("store failure during {operation}")]
    StoreFailure { operation: &'static str },
}

/// Errors from [`OrderStore::place_order`].
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The order was rejected; nothing was written.
    #[error(transparent)]
    Rejected(#[from] PlacementError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store traits
// =============================================================================

/// Catalog storage.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books, oldest first.
    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError>;
    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError>;
    /// Books among `ids` that still exist, in any order.
    async fn books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError>;
    async fn create_book(&self, book: NewBook) -> Result<Book, RepositoryError>;
    /// Returns `None` if the book doesn't exist.
    async fn update_book(
        &self,
        id: BookId,
        update: BookUpdate,
    ) -> Result<Option<Book>, RepositoryError>;
    /// Returns whether a book was deleted.
    async fn delete_book(&self, id: BookId) -> Result<bool, RepositoryError>;
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn admin_exists(&self) -> Result<bool, RepositoryError>;
    /// # Errors
    ///
    /// `Conflict(EMAIL_TAKEN)` or `Conflict(ADMIN_TAKEN)` on a uniqueness violation.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;
    /// The user and their password hash, for login.
    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Per-user cart storage.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Entries in insertion order.
    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError>;
    /// Add to the existing entry for `book`, or append a new one.
    async fn add_cart_item(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError>;
    /// Returns whether an entry existed.
    async fn set_cart_quantity(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError>;
    /// Returns whether an entry existed.
    async fn remove_cart_item(&self, user: UserId, book: BookId) -> Result<bool, RepositoryError>;
    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError>;
}

/// Order ledger storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Validate, persist, decrement stock and (for cart orders) clear the cart
    /// as one atomic unit.
    async fn place_order(
        &self,
        user: UserId,
        source: OrderSource,
    ) -> Result<OrderRecord, PlaceOrderError>;
    /// The user's orders, newest first.
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError>;
    async fn order_by_id(&self, id: OrderId) -> Result<Option<OrderRecord>, RepositoryError>;
    /// Every order, newest first.
    async fn all_orders(&self) -> Result<Vec<OrderRecord>, RepositoryError>;
    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>, RepositoryError>;
}

/// Complaint ledger storage.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    async fn create_complaint(
        &self,
        user: UserId,
        complaint: NewComplaint,
    ) -> Result<Complaint, RepositoryError>;
    /// The user's complaints, newest first.
    async fn complaints_for_user(&self, user: UserId) -> Result<Vec<Complaint>, RepositoryError>;
    async fn complaint_by_id(&self, id: ComplaintId) -> Result<Option<Complaint>, RepositoryError>;
    /// Complaints matching `filter`, newest first.
    async fn list_complaints(
        &self,
        filter: ComplaintFilter,
    ) -> Result<Vec<Complaint>, RepositoryError>;
    async fn update_complaint(
        &self,
        id: ComplaintId,
        update: ComplaintUpdate,
        responder: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Complaint>, RepositoryError>;
    /// Returns whether a complaint was deleted.
    async fn delete_complaint(&self, id: ComplaintId) -> Result<bool, RepositoryError>;
    async fn complaint_stats(&self) -> Result<ComplaintStats, RepositoryError>;
}

/// Everything the API needs from storage.
#[async_trait]
pub trait Store: BookStore + UserStore + CartStore + OrderStore + ComplaintStore {
    /// Readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// [`Store`] backed by `PostgreSQL`.
///
/// Delegates to the per-table repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BookStore for PgStore {
    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError> {
        BookRepository::new(&self.pool).list().await
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        BookRepository::new(&self.pool).get_by_id(id).await
    }

    async fn books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        BookRepository::new(&self.pool).get_many(ids).await
    }

    async fn create_book(&self, book: NewBook) -> Result<Book, RepositoryError> {
        BookRepository::new(&self.pool).create(&book).await
    }

    async fn update_book(
        &self,
        id: BookId,
        update: BookUpdate,
    ) -> Result<Option<Book>, RepositoryError> {
        BookRepository::new(&self.pool).update(id, &update).await
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, RepositoryError> {
        BookRepository::new(&self.pool).delete(id).await
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        UserRepository::new(&self.pool).admin_exists().await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).create(&user).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_many(ids).await
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        UserRepository::new(&self.pool).get_password_hash(email).await
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        CartRepository::new(&self.pool).items(user).await
    }

    async fn add_cart_item(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        CartRepository::new(&self.pool).add(user, book, quantity).await
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        CartRepository::new(&self.pool)
            .set_quantity(user, book, quantity)
            .await
    }

    async fn remove_cart_item(&self, user: UserId, book: BookId) -> Result<bool, RepositoryError> {
        CartRepository::new(&self.pool).remove(user, book).await
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError> {
        CartRepository::new(&self.pool).clear(user).await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(
        &self,
        user: UserId,
        source: OrderSource,
    ) -> Result<OrderRecord, PlaceOrderError> {
        OrderRepository::new(&self.pool).place(user, source).await
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        OrderRepository::new(&self.pool).list_for_user(user).await
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<OrderRecord>, RepositoryError> {
        OrderRepository::new(&self.pool).get_by_id(id).await
    }

    async fn all_orders(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        OrderRepository::new(&self.pool).list_all().await
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>, RepositoryError> {
        OrderRepository::new(&self.pool).set_status(id, status).await
    }
}

#[async_trait]
impl ComplaintStore for PgStore {
    async fn create_complaint(
        &self,
        user: UserId,
        complaint: NewComplaint,
    ) -> Result<Complaint, RepositoryError> {
        ComplaintRepository::new(&self.pool)
            .create(user, &complaint)
            .await
    }

    async fn complaints_for_user(&self, user: UserId) -> Result<Vec<Complaint>, RepositoryError> {
        ComplaintRepository::new(&self.pool).list_for_user(user).await
    }

    async fn complaint_by_id(&self, id: ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        ComplaintRepository::new(&self.pool).get_by_id(id).await
    }

    async fn list_complaints(
        &self,
        filter: ComplaintFilter,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        ComplaintRepository::new(&self.pool).list(&filter).await
    }

    async fn update_complaint(
        &self,
        id: ComplaintId,
        update: ComplaintUpdate,
        responder: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Complaint>, RepositoryError> {
        ComplaintRepository::new(&self.pool)
            .update(id, &update, responder, now)
            .await
    }

    async fn delete_complaint(&self, id: ComplaintId) -> Result<bool, RepositoryError> {
        ComplaintRepository::new(&self.pool).delete(id).await
    }

    async fn complaint_stats(&self) -> Result<ComplaintStats, RepositoryError> {
        ComplaintRepository::new(&self.pool).stats().await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Parse a TEXT enum column, reporting bad values as corruption.
fn parse_column<T>(column: &'static str, value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Ids as plain `i32`s for `= ANY($1)` binds.
fn raw_ids<T: Copy + Into<i32>>(ids: &[T]) -> Vec<i32> {
    ids.iter().map(|&id| id.into()).collect()
}
