//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error answers with a JSON body `{"error": CODE, "message": text}`;
//! insufficient stock adds `book`, `title`, `available` and `requested`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bookstore_core::PlacementError;

use crate::db::{PlaceOrderError, RepositoryError};
use crate::services::auth::{AuthError, TokenError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Bearer token missing a valid signature or expired.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Order placement was rejected.
    #[error("{0}")]
    Placement(#[from] PlacementError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource not found".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<PlaceOrderError> for AppError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::Rejected(e) => Self::Placement(e),
            PlaceOrderError::Repository(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Token(TokenError::Encode(_) | TokenError::InvalidKey(_))
        )
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists | AuthError::AdminAlreadyExists => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Token(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Placement(PlacementError::UnknownBook { .. }) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Placement(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for the response body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        if self.is_server_error() {
            return "INTERNAL_ERROR";
        }
        match self {
            Self::Auth(AuthError::AdminAlreadyExists) => "ADMIN_EXISTS",
            Self::Auth(AuthError::UserAlreadyExists) | Self::Conflict(_) => "CONFLICT",
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound)
            | Self::Token(_)
            | Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Placement(PlacementError::EmptyCart) => "EMPTY_CART",
            Self::Placement(PlacementError::DanglingReference { .. }) => "DANGLING_REFERENCE",
            Self::Placement(PlacementError::InsufficientStock { .. }) => "INSUFFICIENT_STOCK",
            Self::Placement(PlacementError::UnknownBook { .. }) | Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            _ => "INVALID_INPUT",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            _ if self.is_server_error() => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::AdminAlreadyExists => {
                    "An admin account already exists; only one is allowed".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                other => other.to_string(),
            },
            Self::Token(TokenError::Expired) => "Token expired, please log in again".to_string(),
            Self::Token(_) => "Invalid token".to_string(),
            Self::Placement(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::InvalidInput(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Database(_) => String::new(),
        };

        let mut body = json!({
            "error": self.code(),
            "message": message,
        });

        if let Self::Placement(PlacementError::InsufficientStock {
            book,
            title,
            available,
            requested,
        }) = &self
            && let Some(fields) = body.as_object_mut()
        {
            fields.insert("book".to_string(), json!(book));
            fields.insert("title".to_string(), json!(title));
            fields.insert("available".to_string(), json!(available));
            fields.insert("requested".to_string(), json!(requested));
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use bookstore_core::BookId;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("book 123".to_string());
        assert_eq!(err.to_string(), "Not found: book 123");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Placement(PlacementError::EmptyCart).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Placement(PlacementError::UnknownBook {
                book: BookId::new(1)
            })
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Auth(AuthError::AdminAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Auth(AuthError::PasswordHash).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Token(TokenError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_repository_conflict_is_client_error() {
        let err = AppError::from(RepositoryError::Conflict("taken".to_string()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let err = AppError::from(RepositoryError::StoreFailure { operation: "get cart" });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_insufficient_stock_body() {
        let (status, body) = body_json(AppError::Placement(PlacementError::InsufficientStock {
            book: BookId::new(3),
            title: "Dune".to_string(),
            available: 1,
            requested: 2,
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INSUFFICIENT_STOCK");
        assert_eq!(body["book"], 3);
        assert_eq!(body["available"], 1);
        assert_eq!(body["requested"], 2);
    }

    #[tokio::test]
    async fn test_total_too_large_is_invalid_input() {
        let (status, body) = body_json(AppError::Placement(PlacementError::TotalTooLarge)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");
        assert!(body["message"].as_str().unwrap().contains("9999999999.99"));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_json(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "Internal server error");
    }
}
