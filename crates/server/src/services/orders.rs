//! Order service.
//!
//! Placement itself is atomic inside the store; this layer checks the caller
//! still has an account, parses input and resolves stored orders against the
//! catalog for the response.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use bookstore_core::{
    BookId, OrderId, OrderStatus, ParseEnumError, Quantity, RequestedLine, UserId,
};

use super::require_account;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{BookRef, Order, OrderLine, OrderRecord, OrderSource, UserSummary};

/// One line of a manual order.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualLine {
    pub book: BookId,
    pub quantity: Option<i64>,
}

/// Body of a manual order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrder {
    #[serde(default)]
    pub books: Vec<ManualLine>,
    /// Client-side total. Only compared against the computed total.
    pub total_amount: Option<Decimal>,
}

/// Order placement and lookup.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Place an order from the caller's cart and clear it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the account no longer exists.
    /// Returns `AppError::Placement` if the cart is empty, references a
    /// deleted book or asks for more than is in stock.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn place_from_cart(&self, user: UserId) -> Result<Order> {
        require_account(self.store, user).await?;
        let record = self.store.place_order(user, OrderSource::Cart).await?;
        self.resolve_one(record, false).await
    }

    /// Place an order from an explicit line list. The cart is not touched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the account no longer exists.
    /// Returns `AppError::InvalidInput` for a bad quantity.
    /// Returns `AppError::Placement` if a book is unknown or out of stock.
    #[instrument(skip(self, order), fields(user_id = %user, lines = order.books.len()))]
    pub async fn place_manual(&self, user: UserId, order: ManualOrder) -> Result<Order> {
        require_account(self.store, user).await?;
        let lines = order
            .books
            .iter()
            .map(|line| {
                Quantity::new(line.quantity.unwrap_or(1)).map(|quantity| RequestedLine {
                    book: line.book,
                    quantity,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let record = self
            .store
            .place_order(user, OrderSource::Manual(lines))
            .await?;

        if let Some(claimed) = order.total_amount
            && claimed != record.total_amount
        {
            tracing::warn!(
                order_id = %record.id,
                %claimed,
                computed = %record.total_amount,
                "Client total differs from computed total"
            );
        }

        self.resolve_one(record, false).await
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let records = self.store.orders_for_user(user).await?;
        self.resolve(records, false).await
    }

    /// One of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist or belongs to
    /// someone else.
    pub async fn get_for_user(&self, user: UserId, id: OrderId) -> Result<Order> {
        let record = self
            .store
            .order_by_id(id)
            .await?
            .filter(|order| order.user_id == user)
            .ok_or_else(|| order_not_found(id))?;
        self.resolve_one(record, false).await
    }

    /// Every order with its owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_all(&self) -> Result<Vec<Order>> {
        let records = self.store.all_orders().await?;
        self.resolve(records, true).await
    }

    /// Any order, with its owner.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist.
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        let record = self
            .store
            .order_by_id(id)
            .await?
            .ok_or_else(|| order_not_found(id))?;
        self.resolve_one(record, true).await
    }

    /// Set the fulfillment status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for an unknown status.
    /// Returns `AppError::NotFound` if the order doesn't exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_status(&self, id: OrderId, status: &str) -> Result<Order> {
        let status: OrderStatus = status
            .parse()
            .map_err(|e: ParseEnumError| AppError::InvalidInput(e.to_string()))?;

        let record = self
            .store
            .set_order_status(id, status)
            .await?
            .ok_or_else(|| order_not_found(id))?;

        tracing::info!(status = %status, "Order status updated");
        self.resolve_one(record, true).await
    }

    async fn resolve_one(&self, record: OrderRecord, with_user: bool) -> Result<Order> {
        self.resolve(vec![record], with_user)
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("order vanished while resolving".to_string()))
    }

    /// Join records with current book data (and owners for admin views).
    async fn resolve(&self, records: Vec<OrderRecord>, with_users: bool) -> Result<Vec<Order>> {
        let book_ids: Vec<BookId> = records
            .iter()
            .flat_map(|r| r.items.iter().map(|item| item.book))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let books: HashMap<_, _> = self
            .store
            .books_by_ids(&book_ids)
            .await?
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        let users: HashMap<UserId, UserSummary> = if with_users {
            let user_ids: Vec<UserId> = records
                .iter()
                .map(|r| r.user_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            self.store
                .users_by_ids(&user_ids)
                .await?
                .iter()
                .map(|user| (user.id, user.summary()))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(records
            .into_iter()
            .map(|record| Order {
                id: record.id,
                user_id: record.user_id,
                user: users.get(&record.user_id).cloned(),
                books: record
                    .items
                    .iter()
                    .map(|item| OrderLine {
                        book: BookRef::resolve(item.book, &books),
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                    })
                    .collect(),
                total_amount: record.total_amount,
                status: record.status,
                ordered_at: record.ordered_at,
            })
            .collect())
    }
}

fn order_not_found(id: OrderId) -> AppError {
    AppError::NotFound(format!("order {id} not found"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::{Email, PlacementError, Price, Role};

    use super::*;
    use crate::db::{BookStore, CartStore, MemoryStore, OrderStore, UserStore};
    use crate::models::{NewBook, NewUser};

    async fn seed_user(store: &MemoryStore, email: &str) -> UserId {
        store
            .create_user(NewUser {
                name: "Reader".to_string(),
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_string(),
                photo: None,
                role: Role::User,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_book(store: &MemoryStore, title: &str, cents: i64, stock: i32) -> BookId {
        store
            .create_book(NewBook {
                title: title.to_string(),
                author: "Author".to_string(),
                price: Price::new(Decimal::new(cents, 2)).unwrap(),
                stock,
                category: "Fiction".to_string(),
                description: None,
                image: None,
            })
            .await
            .unwrap()
            .id
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_cart_order_total_and_status() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let user = seed_user(&store, "reader@example.com").await;
        let a = seed_book(&store, "A", 1000, 5).await;
        let b = seed_book(&store, "B", 550, 5).await;
        store.add_cart_item(user, a, qty(2)).await.unwrap();
        store.add_cart_item(user, b, qty(1)).await.unwrap();

        let order = orders.place_from_cart(user).await.unwrap();
        assert_eq!(order.total_amount, Decimal::new(2550, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.books.len(), 2);
        assert!(store.cart_items(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let user = seed_user(&store, "reader@example.com").await;
        assert!(matches!(
            orders.place_from_cart(user).await,
            Err(AppError::Placement(PlacementError::EmptyCart))
        ));
        assert!(orders.list_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_account_cannot_order() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let ghost = UserId::new(9999);
        let a = seed_book(&store, "A", 1000, 5).await;
        store.add_cart_item(ghost, a, qty(1)).await.unwrap();

        let err = orders.place_from_cart(ghost).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);

        let err = orders
            .place_manual(
                ghost,
                ManualOrder {
                    books: vec![ManualLine {
                        book: a,
                        quantity: Some(3),
                    }],
                    total_amount: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(store.get_book(a).await.unwrap().unwrap().stock, 5);
        assert!(store.orders_for_user(ghost).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_total_is_rejected() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let user = seed_user(&store, "reader@example.com").await;
        let a = seed_book(&store, "A", 9_999_999_999, i32::MAX).await;

        let err = orders
            .place_manual(
                user,
                ManualOrder {
                    books: vec![ManualLine {
                        book: a,
                        quantity: Some(10_000),
                    }],
                    total_amount: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Placement(PlacementError::TotalTooLarge)
        ));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(
            store.get_book(a).await.unwrap().unwrap().stock,
            i32::MAX
        );
    }

    #[tokio::test]
    async fn test_manual_order_merges_and_ignores_client_total() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let user = seed_user(&store, "reader@example.com").await;
        let a = seed_book(&store, "A", 1000, 5).await;

        let order = orders
            .place_manual(
                user,
                ManualOrder {
                    books: vec![
                        ManualLine {
                            book: a,
                            quantity: Some(1),
                        },
                        ManualLine {
                            book: a,
                            quantity: None,
                        },
                    ],
                    total_amount: Some(Decimal::new(1, 0)),
                },
            )
            .await
            .unwrap();

        assert_eq!(order.books.len(), 1);
        assert_eq!(order.books[0].quantity.get(), 2);
        assert_eq!(order.total_amount, Decimal::new(2000, 2));
        assert_eq!(store.get_book(a).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_manual_unknown_book() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let user = seed_user(&store, "reader@example.com").await;
        let err = orders
            .place_manual(
                user,
                ManualOrder {
                    books: vec![ManualLine {
                        book: BookId::new(77),
                        quantity: Some(1),
                    }],
                    total_amount: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_users_order_is_hidden() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let owner = seed_user(&store, "owner@example.com").await;
        let a = seed_book(&store, "A", 1000, 5).await;
        store.add_cart_item(owner, a, qty(1)).await.unwrap();
        let order = orders.place_from_cart(owner).await.unwrap();

        assert!(orders.get_for_user(owner, order.id).await.is_ok());
        assert!(matches!(
            orders.get_for_user(UserId::new(2), order.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_book_resolves_to_placeholder() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let user = seed_user(&store, "reader@example.com").await;
        let a = seed_book(&store, "A", 1000, 5).await;
        store.add_cart_item(user, a, qty(1)).await.unwrap();
        let order = orders.place_from_cart(user).await.unwrap();

        store.delete_book(a).await.unwrap();

        let order = orders.get_for_user(user, order.id).await.unwrap();
        assert!(order.books[0].book.is_missing());
        assert_eq!(order.total_amount, Decimal::new(1000, 2));
    }

    #[tokio::test]
    async fn test_set_status() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let user = seed_user(&store, "reader@example.com").await;
        let a = seed_book(&store, "A", 1000, 5).await;
        store.add_cart_item(user, a, qty(1)).await.unwrap();
        let order = orders.place_from_cart(user).await.unwrap();

        let shipped = orders.set_status(order.id, "shipped").await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        assert!(matches!(
            orders.set_status(order.id, "lost").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            orders.set_status(OrderId::new(999), "delivered").await,
            Err(AppError::NotFound(_))
        ));
    }
}
