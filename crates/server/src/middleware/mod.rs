//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Security headers
//!
//! Authentication is not a layer: handlers opt in with the
//! [`RequireUser`] and [`RequireAdmin`] extractors.

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{RequireAdmin, RequireUser};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
