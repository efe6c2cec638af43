//! Book repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bookstore_core::{BookId, Price};

use super::{RepositoryError, raw_ids};
use crate::models::{Book, BookUpdate, NewBook};

const BOOK_COLUMNS: &str =
    "id, title, author, price, stock, category, description, image, created_at";

#[derive(sqlx::FromRow)]
pub(super) struct BookRow {
    id: BookId,
    title: String,
    author: String,
    price: Price,
    stock: i32,
    category: String,
    description: Option<String>,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(r: BookRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            author: r.author,
            price: r.price,
            stock: r.stock,
            category: r.category,
            description: r.description,
            image: r.image,
            created_at: r.created_at,
        }
    }
}

/// Repository for catalog operations.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every book, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM book ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Get a book by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM book WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Book::from))
    }

    /// Get every existing book among `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM book WHERE id = ANY($1)"
        ))
        .bind(raw_ids(ids))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Insert a new book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, book: &NewBook) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            r"
            INSERT INTO book (title, author, price, stock, category, description, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BOOK_COLUMNS}
            "
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price)
        .bind(book.stock)
        .bind(&book.category)
        .bind(&book.description)
        .bind(&book.image)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Apply a partial update. Unset fields keep their value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: BookId,
        update: &BookUpdate,
    ) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            r"
            UPDATE book SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                category = COALESCE($6, category),
                description = COALESCE($7, description),
                image = COALESCE($8, image)
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.title)
        .bind(&update.author)
        .bind(update.price)
        .bind(update.stock)
        .bind(&update.category)
        .bind(&update.description)
        .bind(&update.image)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Book::from))
    }

    /// Delete a book. Carts and orders referencing it are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: BookId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM book WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
