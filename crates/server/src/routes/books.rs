//! Catalog route handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use tracing::instrument;

use bookstore_core::BookId;

use super::extract::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::Book;
use crate::services::{BookInput, CatalogService};
use crate::state::AppState;

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/allBooks", get(list))
        .route("/user/book/{id}", get(show))
        .route("/admin/allBooks", get(admin_list))
        .route("/admin/addBook", post(create))
        .route("/admin/updateBook/{id}", post(update))
        .route("/admin/deleteBook/{id}", delete(remove))
}

/// Every book in the catalog.
pub async fn list(
    RequireUser(_): RequireUser,
    State(state): State<AppState>,
) -> Result<ApiJson<Vec<Book>>> {
    Ok(ApiJson(CatalogService::new(state.store()).list().await?))
}

/// One book.
pub async fn show(
    RequireUser(_): RequireUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<ApiJson<Book>> {
    Ok(ApiJson(CatalogService::new(state.store()).get(id).await?))
}

/// Every book, for the admin catalog screen.
pub async fn admin_list(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
) -> Result<ApiJson<Vec<Book>>> {
    Ok(ApiJson(CatalogService::new(state.store()).list().await?))
}

/// Add a book.
#[instrument(skip_all, fields(admin_id = %admin.sub))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BookInput>,
) -> Result<(StatusCode, ApiJson<Book>)> {
    let book = CatalogService::new(state.store()).create(input).await?;
    Ok((StatusCode::CREATED, ApiJson(book)))
}

/// Partially update a book.
#[instrument(skip_all, fields(admin_id = %admin.sub))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(input): ApiJson<BookInput>,
) -> Result<ApiJson<Book>> {
    Ok(ApiJson(
        CatalogService::new(state.store()).update(id, input).await?,
    ))
}

/// Delete a book. Orders that contain it keep a placeholder line.
#[instrument(skip_all, fields(admin_id = %admin.sub))]
pub async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<StatusCode> {
    CatalogService::new(state.store()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
