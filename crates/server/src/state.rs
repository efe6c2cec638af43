//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::BookstoreConfig;
use crate::db::Store;
use crate::services::auth::TokenSigner;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, the token signer and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BookstoreConfig,
    store: Arc<dyn Store>,
    tokens: TokenSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Storage backend (Postgres in production, memory in tests)
    #[must_use]
    pub fn new(config: BookstoreConfig, store: Arc<dyn Store>) -> Self {
        let tokens = TokenSigner::new(config.token_secret.clone(), config.token_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &BookstoreConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the bearer token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }
}
