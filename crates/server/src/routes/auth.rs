//! Account route handlers: admin check, registration, login and profile.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookstore_core::Role;

use super::extract::ApiJson;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::User;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Build the account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/check-admin", get(check_admin))
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/profile", get(profile))
}

/// Registration form.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub photo: Option<String>,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user plus a fresh bearer token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Whether the single admin account exists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminExistsResponse {
    pub admin_exists: bool,
}

/// Report whether an admin has been registered.
///
/// The front end uses this to decide whether to offer admin sign-up.
pub async fn check_admin(State(state): State<AppState>) -> Result<ApiJson<AdminExistsResponse>> {
    let admin_exists = AuthService::new(state.store()).admin_exists().await?;
    Ok(ApiJson(AdminExistsResponse { admin_exists }))
}

/// Create an account and log it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ApiJson<AuthResponse>)> {
    let user = AuthService::new(state.store())
        .register(Registration {
            name: form.name,
            email: form.email,
            password: form.password,
            role: form.role,
            photo: form.photo,
        })
        .await?;

    let token = state.tokens().issue(user.id, user.role, Utc::now())?;
    Ok((StatusCode::CREATED, ApiJson(AuthResponse { user, token })))
}

/// Exchange email and password for a bearer token.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginRequest>,
) -> Result<ApiJson<AuthResponse>> {
    let user = AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await?;

    let token = state.tokens().issue(user.id, user.role, Utc::now())?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(ApiJson(AuthResponse { user, token }))
}

/// The caller's own account.
pub async fn profile(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
) -> Result<ApiJson<User>> {
    let user = AuthService::new(state.store()).get_user(claims.sub).await?;
    Ok(ApiJson(user))
}
