//! Complaint route handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;

use bookstore_core::ComplaintId;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::{AdminComplaint, Complaint, ComplaintFilter, ComplaintStats};
use crate::services::{ComplaintInput, ComplaintService, ComplaintUpdateInput};
use crate::state::AppState;

/// Build the complaint router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/complaint", post(submit))
        .route("/user/complaints", get(list_own))
        .route("/user/complaint/{id}", get(show_own))
        .route("/admin/complaints", get(admin_list))
        .route("/admin/complaints/stats", get(stats))
        .route(
            "/admin/complaint/{id}",
            get(admin_show).put(update).delete(remove),
        )
}

/// File a complaint or feedback.
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn submit(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ComplaintInput>,
) -> Result<(StatusCode, ApiJson<Complaint>)> {
    let complaint = ComplaintService::new(state.store())
        .submit(claims.sub, input)
        .await?;
    Ok((StatusCode::CREATED, ApiJson(complaint)))
}

/// The caller's complaints, newest first.
pub async fn list_own(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
) -> Result<ApiJson<Vec<Complaint>>> {
    Ok(ApiJson(
        ComplaintService::new(state.store())
            .list_for_user(claims.sub)
            .await?,
    ))
}

/// One of the caller's complaints.
pub async fn show_own(
    RequireUser(claims): RequireUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ComplaintId>,
) -> Result<ApiJson<Complaint>> {
    Ok(ApiJson(
        ComplaintService::new(state.store())
            .get_for_user(claims.sub, id)
            .await?,
    ))
}

/// Complaints filtered by `status`, `type`, `priority` and `category`.
pub async fn admin_list(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ComplaintFilter>,
) -> Result<ApiJson<Vec<AdminComplaint>>> {
    Ok(ApiJson(
        ComplaintService::new(state.store()).list(filter).await?,
    ))
}

/// Counts by status, type and category.
pub async fn stats(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
) -> Result<ApiJson<ComplaintStats>> {
    Ok(ApiJson(ComplaintService::new(state.store()).stats().await?))
}

/// Any complaint.
pub async fn admin_show(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ComplaintId>,
) -> Result<ApiJson<AdminComplaint>> {
    Ok(ApiJson(ComplaintService::new(state.store()).get(id).await?))
}

/// Change status or priority, or respond.
#[instrument(skip_all, fields(admin_id = %admin.sub))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ComplaintId>,
    ApiJson(input): ApiJson<ComplaintUpdateInput>,
) -> Result<ApiJson<AdminComplaint>> {
    Ok(ApiJson(
        ComplaintService::new(state.store())
            .update(id, admin.sub, input)
            .await?,
    ))
}

/// Delete a complaint.
#[instrument(skip_all, fields(admin_id = %admin.sub))]
pub async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ComplaintId>,
) -> Result<StatusCode> {
    ComplaintService::new(state.store()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
