//! Authentication extractors.
//!
//! Handlers take [`RequireUser`] or [`RequireAdmin`] to demand a valid
//! `Authorization: Bearer <token>` header.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::Claims;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser(claims): RequireUser) -> impl IntoResponse {
///     format!("Hello, user {}!", claims.sub)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub Claims);

/// Extractor that requires a valid bearer token with the admin role.
///
/// Rejects other authenticated users with 403.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Claims);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens().verify(token, Utc::now())?;

        set_sentry_user(&claims.sub);
        tracing::Span::current().record("user_id", claims.sub.as_i32());

        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(claims) = RequireUser::from_request_parts(parts, state).await?;

        if !claims.role.is_admin() {
            tracing::warn!(user_id = %claims.sub, path = %parts.uri.path(), "Admin route denied");
            return Err(AppError::Forbidden("admin access required".to_string()));
        }

        Ok(Self(claims))
    }
}

/// The token from an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".to_string()))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthorized(
            "malformed authorization header".to_string(),
        ));
    }

    Ok(token.trim())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/user/profile");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert_eq!(bearer_token(&parts(Some("bearer abc.def"))).unwrap(), "abc.def");
        assert!(bearer_token(&parts(None)).is_err());
        assert!(bearer_token(&parts(Some("Basic dXNlcg=="))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
    }
}
