//! End-to-end tests for the bookstore API.
//!
//! Each test spawns the full router (all middleware included) on an
//! ephemeral port, backed by the in-memory store, and talks to it over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookstore-integration-tests
//! ```

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use chrono::Duration;
use reqwest::{Client, Method, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};

use bookstore_server::config::BookstoreConfig;
use bookstore_server::db::MemoryStore;
use bookstore_server::routes::app;
use bookstore_server::state::AppState;

/// A running server plus a client pointed at it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

/// A response status with its parsed body (`Null` when the body is empty).
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

fn test_config() -> BookstoreConfig {
    BookstoreConfig {
        database_url: SecretString::from("postgres://localhost/bookstore_test"),
        host: "127.0.0.1".parse().expect("valid address"),
        port: 0,
        token_secret: SecretString::from("Qe7!vN2#rT9$kW4@pL6^sD1&hG8*mZ3%"),
        token_ttl: Duration::hours(1),
        cors_origin: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestContext {
    /// Start a fresh server with an empty store.
    pub async fn spawn() -> Self {
        let router = app(AppState::new(test_config(), Arc::new(MemoryStore::new())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Test server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
        }
    }

    /// Send a request, optionally authenticated and with a JSON body.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request.send().await.expect("Request failed");
        let status = resp.status();
        let text = resp.text().await.expect("Failed to read response");
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).expect("Response was not JSON")
        };
        Reply { status, body }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Reply {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Reply {
        self.send(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Reply {
        self.send(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Reply {
        self.send(Method::DELETE, path, token, None).await
    }

    /// Register an account and return its bearer token.
    pub async fn register(&self, name: &str, email: &str, role: Option<&str>) -> String {
        let mut body = json!({
            "name": name,
            "email": email,
            "password": "correct horse battery",
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }

        let reply = self.post("/user/register", None, body).await;
        assert_eq!(reply.status, StatusCode::CREATED, "register: {}", reply.body);
        reply.body["token"]
            .as_str()
            .expect("token in register response")
            .to_owned()
    }

    /// Register the admin account.
    pub async fn admin(&self) -> String {
        self.register("Store Admin", "admin@example.com", Some("admin"))
            .await
    }

    /// Add a book as `admin` and return its id.
    pub async fn add_book(&self, admin: &str, title: &str, price: &str, stock: i64) -> i64 {
        let reply = self
            .post(
                "/admin/addBook",
                Some(admin),
                json!({
                    "title": title,
                    "author": "Test Author",
                    "price": price,
                    "stock": stock,
                    "category": "fiction",
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "addBook: {}", reply.body);
        reply.body["id"].as_i64().expect("book id")
    }

    /// Current stock of a book, read through the catalog.
    pub async fn stock_of(&self, token: &str, book: i64) -> i64 {
        let reply = self.get(&format!("/user/book/{book}"), Some(token)).await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.body["stock"].as_i64().expect("stock")
    }
}
