//! In-memory [`Store`] used by tests and local demos.
//!
//! Every table lives in one [`Tables`] value behind a single mutex, so each
//! store call (order placement included) is atomic with respect to every
//! other call.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookstore_core::{
    BookId, BookStock, ComplaintId, ComplaintStatus, Email, LineSource, OrderId, OrderStatus,
    PlacementError, Quantity, RequestedLine, Role, UserId, plan_placement,
};

use super::{
    ADMIN_TAKEN, BookStore, CartStore, ComplaintStore, EMAIL_TAKEN, OrderStore, PlaceOrderError,
    RepositoryError, Store, UserStore,
};
use crate::models::{
    Book, BookUpdate, CartItem, Complaint, ComplaintFilter, ComplaintStats, ComplaintUpdate,
    NewBook, NewComplaint, NewUser, OrderItem, OrderRecord, OrderSource, User,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<UserId, (User, String)>,
    books: BTreeMap<BookId, Book>,
    carts: HashMap<UserId, Vec<CartItem>>,
    orders: BTreeMap<OrderId, OrderRecord>,
    complaints: BTreeMap<ComplaintId, Complaint>,
}

impl Tables {
    /// Ids are shared across tables; they only need to be unique per table.
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self, operation: &'static str) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::StoreFailure { operation })
    }
}

/// Newest first by timestamp, then by id.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError> {
        let tables = self.tables("list books")?;
        Ok(tables.books.values().cloned().collect())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let tables = self.tables("get book")?;
        Ok(tables.books.get(&id).cloned())
    }

    async fn books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        let tables = self.tables("get books")?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.books.get(id).cloned())
            .collect())
    }

    async fn create_book(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let mut tables = self.tables("create book")?;
        let id = BookId::new(tables.next_id());
        let book = Book {
            id,
            title: book.title,
            author: book.author,
            price: book.price,
            stock: book.stock,
            category: book.category,
            description: book.description,
            image: book.image,
            created_at: Utc::now(),
        };
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update_book(
        &self,
        id: BookId,
        update: BookUpdate,
    ) -> Result<Option<Book>, RepositoryError> {
        let mut tables = self.tables("update book")?;
        Ok(tables.books.get_mut(&id).map(|book| {
            update.apply_to(book);
            book.clone()
        }))
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables("delete book")?;
        Ok(tables.books.remove(&id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        let tables = self.tables("check admin")?;
        Ok(tables.users.values().any(|(u, _)| u.role.is_admin()))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables("create user")?;
        if tables.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict(EMAIL_TAKEN.to_owned()));
        }
        if user.role == Role::Admin && tables.users.values().any(|(u, _)| u.role.is_admin()) {
            return Err(RepositoryError::Conflict(ADMIN_TAKEN.to_owned()));
        }

        let id = UserId::new(tables.next_id());
        let created = User {
            id,
            name: user.name,
            email: user.email,
            photo: user.photo,
            role: user.role,
            created_at: Utc::now(),
        };
        tables
            .users
            .insert(id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables("get user")?;
        Ok(tables.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables("get users")?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).map(|(u, _)| u.clone()))
            .collect())
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables("get credentials")?;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let tables = self.tables("get cart")?;
        Ok(tables.carts.get(&user).cloned().unwrap_or_default())
    }

    async fn add_cart_item(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut tables = self.tables("add to cart")?;
        let cart = tables.carts.entry(user).or_default();

        if let Some(entry) = cart.iter_mut().find(|item| item.book == book) {
            entry.quantity = entry
                .quantity
                .checked_add(quantity)
                .map_err(|_| RepositoryError::Conflict("cart quantity too large".to_owned()))?;
            return Ok(*entry);
        }

        let entry = CartItem { book, quantity };
        cart.push(entry);
        Ok(entry)
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        book: BookId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables("update cart")?;
        let entry = tables
            .carts
            .get_mut(&user)
            .and_then(|cart| cart.iter_mut().find(|item| item.book == book));

        match entry {
            Some(item) => {
                item.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_cart_item(&self, user: UserId, book: BookId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables("remove from cart")?;
        let Some(cart) = tables.carts.get_mut(&user) else {
            return Ok(false);
        };
        let before = cart.len();
        cart.retain(|item| item.book != book);
        Ok(cart.len() != before)
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError> {
        let mut tables = self.tables("clear cart")?;
        tables.carts.remove(&user);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(
        &self,
        user: UserId,
        source: OrderSource,
    ) -> Result<OrderRecord, PlaceOrderError> {
        let mut tables = self.tables("place order")?;

        let (line_source, lines): (LineSource, Vec<RequestedLine>) = match source {
            OrderSource::Cart => (
                LineSource::Cart,
                tables
                    .carts
                    .get(&user)
                    .map(|cart| cart.iter().copied().map(RequestedLine::from).collect())
                    .unwrap_or_default(),
            ),
            OrderSource::Manual(lines) => (LineSource::Manual, lines),
        };

        let stock: HashMap<BookId, BookStock> = lines
            .iter()
            .filter_map(|line| tables.books.get(&line.book))
            .map(|book| (book.id, book.stock_level()))
            .collect();
        let plan = plan_placement(line_source, &lines, &stock)?;

        // Apply only after every decrement is known to stay non-negative.
        let mut remaining = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let requested = line.quantity.get();
            let book = stock
                .get(&line.book)
                .ok_or(PlacementError::UnknownBook { book: line.book })?;
            let left = book
                .stock
                .checked_sub(requested)
                .filter(|left| *left >= 0)
                .ok_or_else(|| PlacementError::InsufficientStock {
                    book: book.id,
                    title: book.title.clone(),
                    available: book.stock,
                    requested: i64::from(requested),
                })?;
            remaining.push((line.book, left));
        }
        for (id, left) in remaining {
            if let Some(book) = tables.books.get_mut(&id) {
                book.stock = left;
            }
        }

        let id = OrderId::new(tables.next_id());
        let order = OrderRecord {
            id,
            user_id: user,
            items: plan
                .lines
                .iter()
                .map(|line| OrderItem {
                    book: line.book,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            total_amount: plan.total,
            status: OrderStatus::Pending,
            ordered_at: Utc::now(),
        };
        tables.orders.insert(id, order.clone());

        if line_source == LineSource::Cart {
            tables.carts.remove(&user);
        }

        Ok(order)
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        let tables = self.tables("list orders")?;
        let mut orders: Vec<OrderRecord> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.ordered_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<OrderRecord>, RepositoryError> {
        let tables = self.tables("get order")?;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        let tables = self.tables("list all orders")?;
        let mut orders: Vec<OrderRecord> = tables.orders.values().cloned().collect();
        newest_first(&mut orders, |o| (o.ordered_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>, RepositoryError> {
        let mut tables = self.tables("update order")?;
        Ok(tables.orders.get_mut(&id).map(|order| {
            order.status = status;
            order.clone()
        }))
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn create_complaint(
        &self,
        user: UserId,
        complaint: NewComplaint,
    ) -> Result<Complaint, RepositoryError> {
        let mut tables = self.tables("create complaint")?;
        let id = ComplaintId::new(tables.next_id());
        let now = Utc::now();
        let created = Complaint {
            id,
            user_id: user,
            title: complaint.title,
            description: complaint.description,
            kind: complaint.kind,
            priority: complaint.priority,
            status: ComplaintStatus::Pending,
            category: complaint.category,
            admin_response: None,
            responded_by: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.complaints.insert(id, created.clone());
        Ok(created)
    }

    async fn complaints_for_user(&self, user: UserId) -> Result<Vec<Complaint>, RepositoryError> {
        let tables = self.tables("list complaints")?;
        let mut complaints: Vec<Complaint> = tables
            .complaints
            .values()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect();
        newest_first(&mut complaints, |c| (c.created_at, c.id.as_i32()));
        Ok(complaints)
    }

    async fn complaint_by_id(&self, id: ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        let tables = self.tables("get complaint")?;
        Ok(tables.complaints.get(&id).cloned())
    }

    async fn list_complaints(
        &self,
        filter: ComplaintFilter,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let tables = self.tables("list complaints")?;
        let mut complaints: Vec<Complaint> = tables
            .complaints
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        newest_first(&mut complaints, |c| (c.created_at, c.id.as_i32()));
        Ok(complaints)
    }

    async fn update_complaint(
        &self,
        id: ComplaintId,
        update: ComplaintUpdate,
        responder: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Complaint>, RepositoryError> {
        let mut tables = self.tables("update complaint")?;
        Ok(tables.complaints.get_mut(&id).map(|complaint| {
            complaint.apply(&update, responder, now);
            complaint.clone()
        }))
    }

    async fn delete_complaint(&self, id: ComplaintId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables("delete complaint")?;
        Ok(tables.complaints.remove(&id).is_some())
    }

    async fn complaint_stats(&self) -> Result<ComplaintStats, RepositoryError> {
        let tables = self.tables("complaint stats")?;
        let mut stats = ComplaintStats::default();
        for complaint in tables.complaints.values() {
            stats.record(complaint);
        }
        Ok(stats)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.tables("ping").map(|_| ())
    }
}
