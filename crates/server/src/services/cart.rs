//! Cart service.

use std::collections::HashMap;

use tracing::instrument;

use bookstore_core::{BookId, Quantity, UserId};

use super::require_account;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{BookRef, CartItem, CartLine, CartView};

/// Per-user cart operations.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Add `quantity` copies (default 1) of a book.
    ///
    /// Stock is not checked here; it is checked when the order is placed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if the quantity is below 1.
    /// Returns `AppError::NotFound` if the account or the book doesn't exist.
    /// Returns `AppError::Conflict` if the merged quantity overflows.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn add(&self, user: UserId, book: BookId, quantity: Option<i64>) -> Result<CartItem> {
        let quantity = parse_quantity(quantity.unwrap_or(1))?;
        require_account(self.store, user).await?;

        if self.store.get_book(book).await?.is_none() {
            return Err(AppError::NotFound(format!("book {book} not found")));
        }

        let item = self.store.add_cart_item(user, book, quantity).await?;
        tracing::debug!(quantity = item.quantity.get(), "Cart entry updated");
        Ok(item)
    }

    /// Replace the quantity of an existing entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if the quantity is below 1.
    /// Returns `AppError::NotFound` if the book isn't in the cart.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn update(&self, user: UserId, book: BookId, quantity: i64) -> Result<()> {
        let quantity = parse_quantity(quantity)?;

        if !self.store.set_cart_quantity(user, book, quantity).await? {
            return Err(not_in_cart(book));
        }
        Ok(())
    }

    /// Remove an entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the book isn't in the cart.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn remove(&self, user: UserId, book: BookId) -> Result<()> {
        if !self.store.remove_cart_item(user, book).await? {
            return Err(not_in_cart(book));
        }
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn clear(&self, user: UserId) -> Result<()> {
        Ok(self.store.clear_cart(user).await?)
    }

    /// The cart joined with current book data.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn view(&self, user: UserId) -> Result<CartView> {
        let items = self.store.cart_items(user).await?;
        let ids: Vec<BookId> = items.iter().map(|item| item.book).collect();
        let books: HashMap<_, _> = self
            .store
            .books_by_ids(&ids)
            .await?
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        let lines = items
            .into_iter()
            .map(|item| CartLine {
                book: BookRef::resolve(item.book, &books),
                quantity: item.quantity,
            })
            .collect();

        Ok(CartView::new(lines))
    }
}

fn parse_quantity(n: i64) -> Result<Quantity> {
    Quantity::new(n).map_err(|e| AppError::InvalidInput(e.to_string()))
}

fn not_in_cart(book: BookId) -> AppError {
    AppError::NotFound(format!("book {book} is not in the cart"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use bookstore_core::{Email, Price, Role};

    use super::*;
    use crate::db::{BookStore, MemoryStore, UserStore};
    use crate::models::{NewBook, NewUser};

    async fn seed_user(store: &MemoryStore) -> UserId {
        store
            .create_user(NewUser {
                name: "Reader".to_string(),
                email: Email::parse("reader@example.com").unwrap(),
                password_hash: "hash".to_string(),
                photo: None,
                role: Role::User,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_book(store: &MemoryStore, title: &str) -> BookId {
        store
            .create_book(NewBook {
                title: title.to_string(),
                author: "Author".to_string(),
                price: Price::new(Decimal::new(1000, 2)).unwrap(),
                stock: 5,
                category: "Fiction".to_string(),
                description: None,
                image: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_repeat_add_merges() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let user = seed_user(&store).await;
        let book = seed_book(&store, "Emma").await;

        carts.add(user, book, None).await.unwrap();
        carts.add(user, book, Some(2)).await.unwrap();

        let view = carts.view(user).await.unwrap();
        assert_eq!(view.cart.len(), 1);
        assert_eq!(view.cart[0].quantity.get(), 3);
        assert_eq!(view.total_items, 3);
    }

    #[tokio::test]
    async fn test_add_validation() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let user = seed_user(&store).await;
        let book = seed_book(&store, "Emma").await;

        assert!(matches!(
            carts.add(user, book, Some(0)).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            carts.add(user, BookId::new(999), None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_account_cannot_add() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let ghost = UserId::new(9999);
        let book = seed_book(&store, "Emma").await;

        assert!(matches!(
            carts.add(ghost, book, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(carts.view(ghost).await.unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_remove_require_entry() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let user = seed_user(&store).await;
        let book = seed_book(&store, "Emma").await;

        assert!(matches!(
            carts.update(user, book, 2).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            carts.remove(user, book).await,
            Err(AppError::NotFound(_))
        ));

        carts.add(user, book, None).await.unwrap();
        carts.update(user, book, 4).await.unwrap();
        assert_eq!(carts.view(user).await.unwrap().total_items, 4);

        carts.remove(user, book).await.unwrap();
        assert!(carts.view(user).await.unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_book_is_marked_missing() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let user = seed_user(&store).await;
        let kept = seed_book(&store, "Emma").await;
        let gone = seed_book(&store, "Persuasion").await;

        carts.add(user, kept, None).await.unwrap();
        carts.add(user, gone, None).await.unwrap();
        store.delete_book(gone).await.unwrap();

        let view = carts.view(user).await.unwrap();
        assert!(!view.cart[0].book.is_missing());
        assert!(view.cart[1].book.is_missing());
    }
}
