//! Account email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an account email.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("email is longer than {max} characters")]
    TooLong { max: usize },
    #[error("email must contain whitespace-free text on both sides of a single @")]
    Malformed,
    #[error("email domain must contain a dot")]
    BareDomain,
}

/// A trimmed, lower-cased email address.
///
/// Login and the uniqueness check both compare on this form, so
/// `Ada@Example.com` and `ada@example.com` name the same account.
///
/// ```
/// use bookstore_core::Email;
///
/// assert_eq!(Email::parse(" Reader@Books.COM ").unwrap().as_str(), "reader@books.com");
/// assert!(Email::parse("reader@localhost").is_err());
/// assert!(Email::parse("two@at@signs.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the input is blank, too long, lacks a single
    /// `@` with text on both sides, or has a domain without a dot.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Malformed);
        }

        let (local, domain) = trimmed.split_once('@').ok_or(EmailError::Malformed)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(EmailError::Malformed);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::BareDomain);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for ok in [
            "user@example.com",
            "first.last+books@mail.example.co.uk",
            "a@b.io",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_normalizes() {
        let email = Email::parse("  Reader@Example.COM\n").unwrap();
        assert_eq!(email.as_str(), "reader@example.com");
        assert_eq!(email.to_string(), "reader@example.com");
    }

    #[test]
    fn test_rejects_blank() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_rejects_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["no-at", "@example.com", "user@", "a@b@c.com", "a b@c.com"] {
            assert_eq!(Email::parse(bad), Err(EmailError::Malformed), "{bad}");
        }
    }

    #[test]
    fn test_rejects_dotless_domain() {
        for bad in ["user@localhost", "user@.com", "user@example."] {
            assert_eq!(Email::parse(bad), Err(EmailError::BareDomain), "{bad}");
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let email: Email = serde_json::from_str("\"Ada@Example.com\"").unwrap();
        assert_eq!(email.as_str(), "ada@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
