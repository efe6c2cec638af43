//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOOKSTORE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BOOKSTORE_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `BOOKSTORE_HOST` - Bind address (default: 127.0.0.1)
//! - `BOOKSTORE_PORT` - Listen port (default: 3000)
//! - `BOOKSTORE_TOKEN_TTL_HOURS` - Token lifetime in hours (default: 168)
//! - `BOOKSTORE_CORS_ORIGIN` - Allowed browser origin for the SPA front end
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use chrono::Duration;
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a secret copied from a sample `.env`.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "changeme",
    "placeholder",
    "example",
    "secret",
    "password",
    "your-",
    "replace",
    "xxx",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(&'static str, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct BookstoreConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing secret
    pub token_secret: SecretString,
    /// How long an issued token stays valid
    pub token_ttl: Duration,
    /// Browser origin allowed by CORS, if any
    pub cors_origin: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (production, staging, ...)
    pub sentry_environment: Option<String>,
}

impl BookstoreConfig {
    /// Load configuration from the process environment, reading `.env` first
    /// if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value does
    /// not parse, or the token secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// See [`BookstoreConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset.
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("BOOKSTORE_DATABASE_URL")
            .or_else(|| var("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or(ConfigError::MissingEnvVar("BOOKSTORE_DATABASE_URL"))?;

        let token_secret =
            var("BOOKSTORE_TOKEN_SECRET").ok_or(ConfigError::MissingEnvVar("BOOKSTORE_TOKEN_SECRET"))?;
        check_token_secret(&token_secret)
            .map_err(|reason| ConfigError::InsecureSecret("BOOKSTORE_TOKEN_SECRET", reason))?;

        let ttl_hours: i64 = parse_or(
            "BOOKSTORE_TOKEN_TTL_HOURS",
            var("BOOKSTORE_TOKEN_TTL_HOURS"),
            DEFAULT_TOKEN_TTL_HOURS,
        )?;

        Ok(Self {
            database_url,
            host: parse_or(
                "BOOKSTORE_HOST",
                var("BOOKSTORE_HOST"),
                IpAddr::V4(Ipv4Addr::LOCALHOST),
            )?,
            port: parse_or("BOOKSTORE_PORT", var("BOOKSTORE_PORT"), DEFAULT_PORT)?,
            token_secret: SecretString::from(token_secret),
            token_ttl: token_ttl(ttl_hours)?,
            cors_origin: var("BOOKSTORE_CORS_ORIGIN"),
            sentry_dsn: var("SENTRY_DSN"),
            sentry_environment: var("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse `raw` if present, else use `default`.
fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key, e.to_string()))
    })
}

fn token_ttl(hours: i64) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("BOOKSTORE_TOKEN_TTL_HOURS", reason);
    if hours <= 0 {
        return Err(invalid(format!("must be positive (got {hours})")));
    }
    Duration::try_hours(hours).ok_or_else(|| invalid(format!("out of range ({hours})")))
}

/// Reject short, placeholder-looking or low-entropy signing secrets.
fn check_token_secret(secret: &str) -> Result<(), String> {
    let length = secret.chars().count();
    if length < MIN_TOKEN_SECRET_LENGTH {
        return Err(format!(
            "must be at least {MIN_TOKEN_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = bits_per_char(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); use a randomly generated value"
        ));
    }
    Ok(())
}

/// Shannon entropy of `s` in bits per character.
#[allow(clippy::cast_precision_loss)]
fn bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum()
}
