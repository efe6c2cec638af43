//! Account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstore_core::{Email, Role, UserId};

/// A registered account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub photo: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Validated input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub photo: Option<String>,
    pub role: Role,
}

/// Owner details attached to admin order listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}
