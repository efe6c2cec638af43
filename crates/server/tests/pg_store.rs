//! `PgStore` against a real database.
//!
//! Each test drops and re-creates the schema, so these only run when
//! `BOOKSTORE_TEST_DATABASE_URL` points at a disposable database. They are
//! skipped otherwise.

#![allow(clippy::unwrap_used, clippy::print_stderr)]

use std::env;
use std::sync::{Arc, LazyLock};

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, postgres::PgPoolOptions};
use tokio::sync::{Barrier, Mutex, MutexGuard};

use bookstore_core::{BookId, Email, PlacementError, Price, Quantity, RequestedLine, Role, UserId};
use bookstore_server::db::{
    ADMIN_TAKEN, BookStore, CartStore, EMAIL_TAKEN, OrderStore, PgStore, PlaceOrderError,
    RepositoryError, UserStore,
};
use bookstore_server::models::{NewBook, NewUser, OrderSource};

/// Tests share one database; resets must not interleave.
static SCHEMA_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn test_database_url() -> Option<String> {
    env::var("BOOKSTORE_TEST_DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

async fn reset_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(
        "DROP TABLE IF EXISTS complaint, order_item, customer_order, cart_item, book, app_user, \
         _sqlx_migrations CASCADE",
    )
    .await?;
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn fresh_store() -> Option<(Arc<PgStore>, MutexGuard<'static, ()>)> {
    let Some(url) = test_database_url() else {
        eprintln!("BOOKSTORE_TEST_DATABASE_URL not set; skipping");
        return None;
    };
    let guard = SCHEMA_LOCK.lock().await;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("test database should accept connections");
    reset_schema(&pool)
        .await
        .expect("schema reset and migrations should succeed");

    Some((Arc::new(PgStore::new(pool)), guard))
}

async fn add_user(store: &PgStore, email: &str, role: Role) -> Result<UserId, RepositoryError> {
    let user = store
        .create_user(NewUser {
            name: "Reader".to_string(),
            email: Email::parse(email).expect("test email should be valid"),
            password_hash: "not-a-real-hash".to_string(),
            photo: None,
            role,
        })
        .await?;
    Ok(user.id)
}

async fn add_book(store: &PgStore, title: &str, price: Price, stock: i32) -> BookId {
    store
        .create_book(NewBook {
            title: title.to_string(),
            author: "Author".to_string(),
            price,
            stock,
            category: "fiction".to_string(),
            description: None,
            image: None,
        })
        .await
        .expect("book insert should succeed")
        .id
}

fn qty(n: i64) -> Quantity {
    Quantity::new(n).expect("test quantity should be valid")
}

async fn stock_of(store: &PgStore, book: BookId) -> i32 {
    store
        .get_book(book)
        .await
        .expect("book lookup should succeed")
        .expect("book should exist")
        .stock
}

#[tokio::test]
async fn concurrent_orders_for_last_copy_sell_it_once() {
    let Some((store, _guard)) = fresh_store().await else {
        return;
    };

    // Given: one copy left and two readers with it in their carts
    let book = add_book(&store, "Last Copy", Price::new(Decimal::new(1500, 2)).unwrap(), 1).await;
    let first = add_user(&store, "first@example.com", Role::User).await.unwrap();
    let second = add_user(&store, "second@example.com", Role::User).await.unwrap();
    store.add_cart_item(first, book, qty(1)).await.unwrap();
    store.add_cart_item(second, book, qty(1)).await.unwrap();

    // When: both place their cart at the same moment
    let barrier = Arc::new(Barrier::new(3));
    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|user| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                store.place_order(user, OrderSource::Cart).await
            })
        })
        .collect();
    barrier.wait().await;

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("placement task should not panic"));
    }

    // Then: exactly one order exists and stock never goes negative
    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1, "exactly one placement should win: {results:?}");
    assert!(results.iter().any(|r| matches!(
        r,
        Err(PlaceOrderError::Rejected(PlacementError::InsufficientStock {
            available: 0,
            requested: 1,
            ..
        }))
    )));
    assert_eq!(stock_of(&store, book).await, 0);

    let orders = store.all_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let loser = if orders[0].user_id == first { second } else { first };
    assert_eq!(store.cart_items(loser).await.unwrap().len(), 1);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_every_line() {
    let Some((store, _guard)) = fresh_store().await else {
        return;
    };

    // Given: a cart whose second line asks for more than is left
    let plenty = add_book(&store, "Plenty", Price::new(Decimal::ONE).unwrap(), 5).await;
    let scarce = add_book(&store, "Scarce", Price::new(Decimal::ONE).unwrap(), 1).await;
    let user = add_user(&store, "reader@example.com", Role::User).await.unwrap();
    store.add_cart_item(user, plenty, qty(2)).await.unwrap();
    store.add_cart_item(user, scarce, qty(2)).await.unwrap();

    // When: the cart is placed
    let err = store
        .place_order(user, OrderSource::Cart)
        .await
        .expect_err("placement should be rejected");

    // Then: nothing was decremented, written or cleared
    assert!(matches!(
        err,
        PlaceOrderError::Rejected(PlacementError::InsufficientStock {
            available: 1,
            requested: 2,
            ..
        })
    ));
    assert_eq!(stock_of(&store, plenty).await, 5);
    assert_eq!(stock_of(&store, scarce).await, 1);
    assert_eq!(store.cart_items(user).await.unwrap().len(), 2);
    assert!(store.orders_for_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_manual_lines_share_the_stock_check() {
    let Some((store, _guard)) = fresh_store().await else {
        return;
    };

    let book = add_book(&store, "Single", Price::new(Decimal::ONE).unwrap(), 1).await;
    let user = add_user(&store, "reader@example.com", Role::User).await.unwrap();
    let line = RequestedLine {
        book,
        quantity: qty(1),
    };

    let err = store
        .place_order(user, OrderSource::Manual(vec![line, line]))
        .await
        .expect_err("two copies of a single-copy book should be rejected");

    assert!(matches!(
        err,
        PlaceOrderError::Rejected(PlacementError::InsufficientStock { requested: 2, .. })
    ));
    assert_eq!(stock_of(&store, book).await, 1);
}

#[tokio::test]
async fn largest_price_and_total_fit_their_columns() {
    let Some((store, _guard)) = fresh_store().await else {
        return;
    };

    let book = add_book(&store, "Folio", Price::MAX, 100).await;
    let user = add_user(&store, "collector@example.com", Role::User).await.unwrap();

    let order = store
        .place_order(
            user,
            OrderSource::Manual(vec![RequestedLine {
                book,
                quantity: qty(100),
            }]),
        )
        .await
        .expect("a total at the column limit should be stored");

    assert_eq!(order.total_amount, Decimal::new(999_999_999_900, 2));
    assert_eq!(order.items[0].unit_price, Price::MAX);
    assert_eq!(stock_of(&store, book).await, 0);
}

#[tokio::test]
async fn only_one_admin_and_one_account_per_email() {
    let Some((store, _guard)) = fresh_store().await else {
        return;
    };

    add_user(&store, "admin@example.com", Role::Admin).await.unwrap();

    let second_admin = add_user(&store, "other-admin@example.com", Role::Admin).await;
    assert!(
        matches!(&second_admin, Err(RepositoryError::Conflict(msg)) if msg == ADMIN_TAKEN),
        "{second_admin:?}"
    );

    let duplicate = add_user(&store, "ADMIN@example.com", Role::User).await;
    assert!(
        matches!(&duplicate, Err(RepositoryError::Conflict(msg)) if msg == EMAIL_TAKEN),
        "{duplicate:?}"
    );

    assert!(store.admin_exists().await.unwrap());
}
