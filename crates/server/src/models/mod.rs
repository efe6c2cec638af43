//! Domain models for the bookstore API.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. All of them serialize as camelCase JSON.

pub mod book;
pub mod cart;
pub mod complaint;
pub mod order;
pub mod user;

pub use book::{Book, BookRef, BookUpdate, MissingBook, NewBook};
pub use cart::{CartItem, CartLine, CartView};
pub use complaint::{
    AdminComplaint, Complaint, ComplaintFilter, ComplaintStats, ComplaintUpdate, MAX_DESCRIPTION_CHARS,
    MAX_TITLE_CHARS, NewComplaint,
};
pub use order::{Order, OrderItem, OrderLine, OrderRecord, OrderSource};
pub use user::{NewUser, User, UserSummary};
