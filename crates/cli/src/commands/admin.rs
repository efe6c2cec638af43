//! Admin account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! bookstore-cli admin create -n "Store Admin" -e admin@example.com -p 'long passphrase'
//! ```
//!
//! The password may also come from `BOOKSTORE_ADMIN_PASSWORD` so it stays
//! out of shell history.

use thiserror::Error;

use bookstore_core::Role;
use bookstore_server::db::PgStore;
use bookstore_server::services::auth::{AuthError, AuthService, Registration};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// An admin account already exists.
    #[error("An admin account already exists; only one is allowed")]
    AdminExists,

    #[error("Could not create admin: {0}")]
    Auth(AuthError),
}

impl From<AuthError> for AdminError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AdminAlreadyExists => Self::AdminExists,
            other => Self::Auth(other),
        }
    }
}

/// Create the admin account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `AdminError::AdminExists` if an admin is already registered, or
/// `AdminError::Auth` for invalid input or a duplicate email.
pub async fn create(name: &str, email: &str, password: &str) -> Result<i32, AdminError> {
    let store = PgStore::new(connect().await?);

    tracing::info!("Creating admin account: {}", email);

    let user = AuthService::new(&store)
        .register(Registration {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            role: Some(Role::Admin),
            photo: None,
        })
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id.as_i32())
}
