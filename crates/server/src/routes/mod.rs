//! HTTP route handlers for the bookstore API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (store ping)
//!
//! # Accounts
//! GET  /user/check-admin          - Whether an admin exists
//! POST /user/register             - Create account, returns token
//! POST /user/login                - Returns token
//! GET  /user/profile              - Caller's account
//!
//! # Catalog
//! GET  /user/allBooks             - List books
//! GET  /user/book/{id}            - Book detail
//! GET  /admin/allBooks            - List books (admin)
//! POST /admin/addBook             - Create book (admin)
//! POST /admin/updateBook/{id}     - Partial update (admin)
//! DELETE /admin/deleteBook/{id}   - Delete book (admin)
//!
//! # Cart
//! GET|POST|DELETE /user/cart      - View, add, clear
//! PUT|DELETE /user/cart/{bookId}  - Set quantity, remove
//!
//! # Orders
//! POST /user/order                - Place from cart
//! POST /user/order/manual         - Place from line list
//! GET  /user/orders[/{id}]        - Own orders
//! GET  /admin/orders[/{id}]       - All orders (admin)
//! PUT  /admin/orders/{id}         - Set status (admin)
//!
//! # Complaints
//! POST /user/complaint            - Submit
//! GET  /user/complaints           - Own complaints
//! GET  /user/complaint/{id}       - Own complaint
//! GET  /admin/complaints          - Filtered list (admin)
//! GET  /admin/complaints/stats    - Counts (admin)
//! GET|PUT|DELETE /admin/complaint/{id} - Manage (admin)
//! ```

pub mod auth;
pub mod books;
pub mod cart;
pub mod complaints;
pub mod extract;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(books::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(complaints::router())
}

/// Build the complete application: routes, health checks and middleware.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config().cors_origin.as_deref());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured front-end origin; same-origin only when unset.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::new();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid CORS origin");
            CorsLayer::new()
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
