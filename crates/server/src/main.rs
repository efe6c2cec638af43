//! Bookstore API server.
//!
//! Serves the REST API on `BOOKSTORE_HOST:BOOKSTORE_PORT` (default
//! 127.0.0.1:3000) against `PostgreSQL`.
//!
//! Migrations are NOT run on startup; apply them with
//! `bookstore-cli migrate` first.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;
use std::sync::Arc;

use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use bookstore_server::config::BookstoreConfig;
use bookstore_server::db::{PgStore, create_pool};
use bookstore_server::routes;
use bookstore_server::state::AppState;

const DEFAULT_LOG_FILTER: &str = "bookstore_server=info,tower_http=debug";

/// Start Sentry when a DSN is configured. The guard flushes on drop.
fn init_sentry(config: &BookstoreConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.sentry_environment.clone().map(Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug ride along as
/// breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => EventFilter::Breadcrumb,
        tracing::Level::TRACE => EventFilter::Ignore,
    }
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to one JSON
/// object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true)))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = BookstoreConfig::from_env().expect("Failed to load configuration");

    // Sentry before the subscriber so the tracing layer has a client.
    let _sentry_guard = init_sentry(&config);
    init_tracing();
    if config.sentry_dsn.is_some() {
        tracing::info!("Sentry initialized");
    }

    let pool = create_pool(&config.database_url)
        .await
        .expect("Failed to connect to PostgreSQL");

    let addr = config.socket_addr();
    let app = routes::app(AppState::new(config, Arc::new(PgStore::new(pool))));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "bookstore API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
