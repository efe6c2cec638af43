//! Order repository for database operations.
//!
//! Placement runs in one transaction: the cart rows and the touched book rows
//! are locked (books in id order, so concurrent placements can't deadlock),
//! the order is planned against that snapshot, and each decrement is
//! conditional on enough stock remaining.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use bookstore_core::{
    BookId, BookStock, LineSource, OrderId, OrderStatus, PlacementError, Price, Quantity,
    RequestedLine, UserId, plan_placement,
};

use super::carts::CartItemRow;
use super::{PlaceOrderError, RepositoryError, parse_column, raw_ids};
use crate::models::{CartItem, OrderItem, OrderRecord, OrderSource};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total_amount: Decimal,
    status: String,
    ordered_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    book_id: BookId,
    quantity: i32,
    unit_price: Price,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    id: BookId,
    title: String,
    price: Price,
    stock: i32,
}

impl From<StockRow> for BookStock {
    fn from(r: StockRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            price: r.price,
            stock: r.stock,
        }
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(r: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(r.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order quantity in database: {e}"))
        })?;
        Ok(Self {
            book: r.book_id,
            quantity,
            unit_price: r.unit_price,
        })
    }
}

fn to_record(row: OrderRow, items: Vec<OrderItem>) -> Result<OrderRecord, RepositoryError> {
    Ok(OrderRecord {
        id: row.id,
        user_id: row.user_id,
        items,
        total_amount: row.total_amount,
        status: parse_column::<OrderStatus>("order status", &row.status)?,
        ordered_at: row.ordered_at,
    })
}

/// Repository for the order ledger.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order atomically.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Rejected` if the order fails validation; the
    /// transaction is rolled back and nothing changes.
    /// Returns `PlaceOrderError::Repository` for database errors.
    pub async fn place(
        &self,
        user: UserId,
        source: OrderSource,
    ) -> Result<OrderRecord, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let (line_source, lines) = match source {
            OrderSource::Cart => (LineSource::Cart, locked_cart(&mut tx, user).await?),
            OrderSource::Manual(lines) => (LineSource::Manual, lines),
        };

        let books = locked_stock(&mut tx, &lines).await?;
        let plan = plan_placement(line_source, &lines, &books)?;

        for line in &plan.lines {
            let result = sqlx::query(
                "UPDATE book SET stock = stock - $1 WHERE id = $2 AND stock >= $1",
            )
            .bind(line.quantity.get())
            .bind(line.book)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Rows are locked, so this only happens if the plan and the
                // table disagree; treat it as the stock check failing.
                let (title, available) = books
                    .get(&line.book)
                    .map_or_else(|| (String::new(), 0), |b| (b.title.clone(), b.stock));
                return Err(PlacementError::InsufficientStock {
                    book: line.book,
                    title,
                    available,
                    requested: i64::from(line.quantity.get()),
                }
                .into());
            }
        }

        let order = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO customer_order (user_id, total_amount, status)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, total_amount, status, ordered_at
            ",
        )
        .bind(user)
        .bind(plan.total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            sqlx::query(
                r"
                INSERT INTO order_item (order_id, book_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order.id)
            .bind(line.book)
            .bind(line.quantity.get())
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;

            items.push(OrderItem {
                book: line.book,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        if line_source == LineSource::Cart {
            sqlx::query("DELETE FROM cart_item WHERE user_id = $1")
                .bind(user)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %order.id, user_id = %user, total = %plan.total, "Order placed");
        Ok(to_record(order, items)?)
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_amount, status, ordered_at
            FROM customer_order
            WHERE user_id = $1
            ORDER BY ordered_at DESC, id DESC
            ",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_amount, status, ordered_at
            FROM customer_order
            ORDER BY ordered_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Get an order by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<OrderRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_amount, status, ordered_at
            FROM customer_order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Set the fulfillment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE customer_order SET status = $2
            WHERE id = $1
            RETURNING id, user_id, total_amount, status, ordered_at
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Load line items for `rows` with one query, keeping row order.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<OrderRecord>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, book_id, quantity, unit_price
            FROM order_item
            WHERE order_id = ANY($1)
            ORDER BY order_id, id
            ",
        )
        .bind(raw_ids(&ids))
        .fetch_all(self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items
                .entry(row.order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                to_record(row, lines)
            })
            .collect()
    }
}

/// Read and lock the user's cart.
async fn locked_cart(
    tx: &mut Transaction<'_, Postgres>,
    user: UserId,
) -> Result<Vec<RequestedLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        "SELECT book_id, quantity FROM cart_item WHERE user_id = $1 ORDER BY id FOR UPDATE",
    )
    .bind(user)
    .fetch_all(&mut **tx)
    .await?;

    rows.into_iter()
        .map(|row| CartItem::try_from(row).map(RequestedLine::from))
        .collect()
}

/// Read and lock the books referenced by `lines`, in id order.
async fn locked_stock(
    tx: &mut Transaction<'_, Postgres>,
    lines: &[RequestedLine],
) -> Result<HashMap<BookId, BookStock>, RepositoryError> {
    let ids: BTreeSet<BookId> = lines.iter().map(|l| l.book).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<BookId> = ids.into_iter().collect();

    let rows = sqlx::query_as::<_, StockRow>(
        r"
        SELECT id, title, price, stock
        FROM book
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(raw_ids(&ids))
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.id, BookStock::from(row)))
        .collect())
}
