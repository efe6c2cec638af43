//! Cart route handlers.
//!
//! Every mutation answers with the updated cart so the client never has to
//! refetch it.

use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::Deserialize;

use bookstore_core::BookId;

use super::extract::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::CartView;
use crate::services::CartService;
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/cart", get(show).post(add).delete(clear))
        .route("/user/cart/{book_id}", put(update).delete(remove))
}

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub book_id: BookId,
    pub quantity: Option<i64>,
}

/// Quantity change request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i64,
}

/// The caller's cart.
pub async fn show(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
) -> Result<ApiJson<CartView>> {
    Ok(ApiJson(CartService::new(state.store()).view(claims.sub).await?))
}

/// Add copies of a book.
pub async fn add(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<ApiJson<CartView>> {
    let carts = CartService::new(state.store());
    carts.add(claims.sub, body.book_id, body.quantity).await?;
    Ok(ApiJson(carts.view(claims.sub).await?))
}

/// Set the quantity of an entry.
pub async fn update(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<BookId>,
    ApiJson(body): ApiJson<UpdateCartRequest>,
) -> Result<ApiJson<CartView>> {
    let carts = CartService::new(state.store());
    carts.update(claims.sub, book_id, body.quantity).await?;
    Ok(ApiJson(carts.view(claims.sub).await?))
}

/// Remove an entry.
pub async fn remove(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<BookId>,
) -> Result<ApiJson<CartView>> {
    let carts = CartService::new(state.store());
    carts.remove(claims.sub, book_id).await?;
    Ok(ApiJson(carts.view(claims.sub).await?))
}

/// Empty the cart.
pub async fn clear(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
) -> Result<ApiJson<CartView>> {
    let carts = CartService::new(state.store());
    carts.clear(claims.sub).await?;
    Ok(ApiJson(carts.view(claims.sub).await?))
}
