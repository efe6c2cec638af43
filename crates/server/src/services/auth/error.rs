//! Account error types.

use thiserror::Error;

use bookstore_core::EmailError;

use crate::db::RepositoryError;

/// Why registration, login or a profile lookup failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("name is required")]
    MissingName,

    /// Unknown email or wrong password; the two are not distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The token names an account that no longer exists.
    #[error("account not found")]
    UserNotFound,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Only one admin account may exist.
    #[error("an admin account already exists")]
    AdminAlreadyExists,

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("account storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}
