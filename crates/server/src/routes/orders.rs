//! Order route handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use bookstore_core::OrderId;

use super::extract::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::Order;
use crate::services::{ManualOrder, OrderService};
use crate::state::AppState;

/// Build the order router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/order", post(place))
        .route("/user/order/manual", post(place_manual))
        .route("/user/orders", get(list_own))
        .route("/user/orders/{id}", get(show_own))
        .route("/admin/orders", get(admin_list))
        .route("/admin/orders/{id}", get(admin_show).put(set_status))
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Place an order from the caller's cart.
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn place(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, ApiJson<Order>)> {
    let order = OrderService::new(state.store())
        .place_from_cart(claims.sub)
        .await?;
    Ok((StatusCode::CREATED, ApiJson(order)))
}

/// Place an order from an explicit line list.
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn place_manual(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ManualOrder>,
) -> Result<(StatusCode, ApiJson<Order>)> {
    let order = OrderService::new(state.store())
        .place_manual(claims.sub, body)
        .await?;
    Ok((StatusCode::CREATED, ApiJson(order)))
}

/// The caller's orders, newest first.
pub async fn list_own(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
) -> Result<ApiJson<Vec<Order>>> {
    Ok(ApiJson(
        OrderService::new(state.store())
            .list_for_user(claims.sub)
            .await?,
    ))
}

/// One of the caller's orders.
pub async fn show_own(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiJson<Order>> {
    Ok(ApiJson(
        OrderService::new(state.store())
            .get_for_user(claims.sub, id)
            .await?,
    ))
}

/// Every order with its owner.
pub async fn admin_list(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
) -> Result<ApiJson<Vec<Order>>> {
    Ok(ApiJson(OrderService::new(state.store()).list_all().await?))
}

/// Any order with its owner.
pub async fn admin_show(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiJson<Order>> {
    Ok(ApiJson(OrderService::new(state.store()).get(id).await?))
}

/// Move an order to pending, shipped or delivered.
#[instrument(skip_all, fields(admin_id = %admin.sub))]
pub async fn set_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<ApiJson<Order>> {
    Ok(ApiJson(
        OrderService::new(state.store())
            .set_status(id, &body.status)
            .await?,
    ))
}
