//! Cart repository for database operations.

use sqlx::PgPool;

use bookstore_core::{BookId, Quantity, UserId};

use super::RepositoryError;
use crate::models::CartItem;

/// Postgres `numeric_value_out_of_range`, raised when a merged quantity overflows.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

#[derive(sqlx::FromRow)]
pub(super) struct CartItemRow {
    pub(super) book_id: BookId,
    pub(super) quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(r: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(r.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid cart quantity in database: {e}"))
        })?;
        Ok(Self {
            book: r.book_id,
            quantity,
        })
    }
}

/// Repository for per-user carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Entries in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT book_id, quantity FROM cart_item WHERE user_id = $1 ORDER BY id",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// Add `quantity` copies of `book`, merging into an existing entry.
    ///
    /// The upsert keeps the original row, so a merged entry keeps its position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the merged quantity overflows.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_item (user_id, book_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, book_id)
            DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity
            RETURNING book_id, quantity
            ",
        )
        .bind(user)
        .bind(book)
        .bind(quantity.get())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
            {
                return RepositoryError::Conflict("cart quantity too large".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        CartItem::try_from(row)
    }

    /// Replace the quantity of an existing entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_quantity(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_item SET quantity = $3 WHERE user_id = $1 AND book_id = $2",
        )
        .bind(user)
        .bind(book)
        .bind(quantity.get())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(&self, user: UserId, book: BookId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_item WHERE user_id = $1 AND book_id = $2")
            .bind(user)
            .bind(book)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_item WHERE user_id = $1")
            .bind(user)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
