//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bookstore_core::{Email, Role, UserId};

use super::{ADMIN_TAKEN, EMAIL_TAKEN, RepositoryError, parse_column, raw_ids};
use crate::models::{NewUser, User};

/// Partial unique index allowing a single `role = 'admin'` row.
const SINGLE_ADMIN_INDEX: &str = "app_user_single_admin";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    photo: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            name: r.name,
            email,
            photo: r.photo,
            role: parse_column::<Role>("role", &r.role)?,
            created_at: r.created_at,
        })
    }
}

/// Repository for account operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether an admin account exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM app_user WHERE role = 'admin')")
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, photo, role, created_at
            FROM app_user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get every existing user among `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, photo, role, created_at
            FROM app_user
            WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids(ids))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken or an admin
    /// already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO app_user (name, email, password_hash, photo, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, photo, role, created_at
            ",
        )
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.photo)
        .bind(user.role.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let message = if db_err.constraint() == Some(SINGLE_ADMIN_INDEX) {
                    ADMIN_TAKEN
                } else {
                    EMAIL_TAKEN
                };
                return RepositoryError::Conflict(message.to_owned());
            }
            RepositoryError::Database(e)
        })?;

        User::try_from(row)
    }

    /// Get a user with their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, name, email, photo, role, created_at, password_hash
            FROM app_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }
}
