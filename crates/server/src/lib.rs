//! Bookstore API library.
//!
//! The server is a library so the router can be driven in tests against the
//! in-memory store; `main.rs` only wires it to `PostgreSQL` and a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
