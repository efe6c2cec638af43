//! Authentication service.
//!
//! Password accounts with Argon2id hashes, plus signed bearer tokens
//! (see [`token`]).

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use bookstore_core::{Email, Role, UserId};

use crate::db::{ADMIN_TAKEN, RepositoryError, Store};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration input as submitted by the client.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub photo: Option<String>,
}

/// Authentication service.
///
/// Handles registration, login and profile lookups.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Whether the single admin account has been created.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn admin_exists(&self) -> Result<bool, AuthError> {
        Ok(self.store.admin_exists().await?)
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::AdminAlreadyExists` if `role` is admin and one exists.
    #[instrument(skip_all, fields(role))]
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let name = registration.name.trim().to_owned();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        let role = registration.role.unwrap_or_default();
        tracing::Span::current().record("role", role.as_str());

        // Cheap early answer; the unique index is what actually enforces it.
        if role.is_admin() && self.store.admin_exists().await? {
            return Err(AuthError::AdminAlreadyExists);
        }

        let password_hash = hash_password(&registration.password)?;
        let photo = registration
            .photo
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());

        let user = self
            .store
            .create_user(NewUser {
                name,
                email,
                password_hash,
                photo,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) if msg == ADMIN_TAKEN => {
                    AuthError::AdminAlreadyExists
                }
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .credentials_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn registration(email: &str, role: Option<Role>) -> Registration {
        Registration {
            name: "  Ada Lovelace ".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            role,
            photo: None,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(verify_password("hunter23", &hash).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_register_normalizes_and_logs_in() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth
            .register(registration("Ada@Example.COM", None))
            .await
            .unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email.as_str(), "ada@example.com");
        assert_eq!(user.role, Role::User);

        let logged_in = auth
            .login("ada@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(matches!(
            auth.login("ada@example.com", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(registration("a@b.co", None)).await.unwrap();
        assert!(matches!(
            auth.register(registration("A@B.co", None)).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_second_admin_rejected() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(registration("root@b.co", Some(Role::Admin)))
            .await
            .unwrap();
        assert!(auth.admin_exists().await.unwrap());
        assert!(matches!(
            auth.register(registration("other@b.co", Some(Role::Admin)))
                .await,
            Err(AuthError::AdminAlreadyExists)
        ));
    }
}
