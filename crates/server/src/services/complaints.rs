//! Complaint and feedback service.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use bookstore_core::{
    ComplaintCategory, ComplaintId, ComplaintPriority, ComplaintStatus, ComplaintType, UserId,
};

use super::require_account;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{
    AdminComplaint, Complaint, ComplaintFilter, ComplaintStats, ComplaintUpdate,
    MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS, NewComplaint, UserSummary,
};

/// A complaint as submitted by a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ComplaintType>,
    pub priority: Option<ComplaintPriority>,
    pub category: Option<ComplaintCategory>,
}

/// An admin's changes to a complaint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintUpdateInput {
    pub status: Option<ComplaintStatus>,
    pub priority: Option<ComplaintPriority>,
    pub admin_response: Option<String>,
}

/// Complaint submission and the admin response workflow.
pub struct ComplaintService<'a> {
    store: &'a dyn Store,
}

impl<'a> ComplaintService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// File a complaint. Unset type, priority and category take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if the title or description is
    /// missing or too long.
    /// Returns `AppError::NotFound` if the account no longer exists.
    #[instrument(skip(self, input), fields(user_id = %user))]
    pub async fn submit(&self, user: UserId, input: ComplaintInput) -> Result<Complaint> {
        let complaint = NewComplaint {
            title: bounded_text("title", input.title, MAX_TITLE_CHARS)?,
            description: bounded_text("description", input.description, MAX_DESCRIPTION_CHARS)?,
            kind: input.kind.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            category: input.category.unwrap_or_default(),
        };
        require_account(self.store, user).await?;

        let complaint = self.store.create_complaint(user, complaint).await?;
        tracing::info!(complaint_id = %complaint.id, kind = %complaint.kind, "Complaint submitted");
        Ok(complaint)
    }

    /// The caller's complaints, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Complaint>> {
        Ok(self.store.complaints_for_user(user).await?)
    }

    /// One of the caller's complaints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it doesn't exist or belongs to someone else.
    pub async fn get_for_user(&self, user: UserId, id: ComplaintId) -> Result<Complaint> {
        self.store
            .complaint_by_id(id)
            .await?
            .filter(|c| c.user_id == user)
            .ok_or_else(|| complaint_not_found(id))
    }

    /// Complaints matching `filter`, newest first, with their accounts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list(&self, filter: ComplaintFilter) -> Result<Vec<AdminComplaint>> {
        let complaints = self.store.list_complaints(filter).await?;
        self.with_accounts(complaints).await
    }

    /// Any complaint, with its accounts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it doesn't exist.
    pub async fn get(&self, id: ComplaintId) -> Result<AdminComplaint> {
        let complaint = self
            .store
            .complaint_by_id(id)
            .await?
            .ok_or_else(|| complaint_not_found(id))?;
        self.with_accounts_one(complaint).await
    }

    /// Change status or priority, or attach a response.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for an empty update or blank response.
    /// Returns `AppError::NotFound` if the complaint doesn't exist.
    #[instrument(skip(self, input), fields(complaint_id = %id, admin_id = %responder))]
    pub async fn update(
        &self,
        id: ComplaintId,
        responder: UserId,
        input: ComplaintUpdateInput,
    ) -> Result<AdminComplaint> {
        let admin_response = input
            .admin_response
            .map(|r| {
                let r = r.trim();
                if r.is_empty() {
                    Err(AppError::InvalidInput(
                        "admin response cannot be empty".to_string(),
                    ))
                } else {
                    Ok(r.to_owned())
                }
            })
            .transpose()?;

        let update = ComplaintUpdate {
            status: input.status,
            priority: input.priority,
            admin_response,
        };
        if update == ComplaintUpdate::default() {
            return Err(AppError::InvalidInput("no fields to update".to_string()));
        }

        let complaint = self
            .store
            .update_complaint(id, update, responder, Utc::now())
            .await?
            .ok_or_else(|| complaint_not_found(id))?;

        tracing::info!(status = %complaint.status, "Complaint updated");
        self.with_accounts_one(complaint).await
    }

    /// Delete a complaint.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it doesn't exist.
    #[instrument(skip(self), fields(complaint_id = %id))]
    pub async fn delete(&self, id: ComplaintId) -> Result<()> {
        if !self.store.delete_complaint(id).await? {
            return Err(complaint_not_found(id));
        }
        Ok(())
    }

    /// Counts for the admin overview.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn stats(&self) -> Result<ComplaintStats> {
        Ok(self.store.complaint_stats().await?)
    }

    async fn with_accounts_one(&self, complaint: Complaint) -> Result<AdminComplaint> {
        self.with_accounts(vec![complaint])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("complaint vanished while resolving".to_string()))
    }

    /// Attach submitter and responder summaries in one lookup.
    async fn with_accounts(&self, complaints: Vec<Complaint>) -> Result<Vec<AdminComplaint>> {
        let ids: Vec<UserId> = complaints
            .iter()
            .flat_map(|c| std::iter::once(c.user_id).chain(c.responded_by))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let users: HashMap<UserId, UserSummary> = self
            .store
            .users_by_ids(&ids)
            .await?
            .iter()
            .map(|user| (user.id, user.summary()))
            .collect();

        Ok(complaints
            .into_iter()
            .map(|complaint| AdminComplaint {
                user: users.get(&complaint.user_id).cloned(),
                responder: complaint
                    .responded_by
                    .and_then(|id| users.get(&id))
                    .cloned(),
                complaint,
            })
            .collect())
    }
}

fn bounded_text(field: &str, value: Option<String>, max_chars: usize) -> Result<String> {
    let value = value.as_deref().map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::InvalidInput(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value.to_owned())
}

fn complaint_not_found(id: ComplaintId) -> AppError {
    AppError::NotFound(format!("complaint {id} not found"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::{Email, Role};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::NewUser;

    async fn seed_user(store: &MemoryStore, name: &str, email: &str, role: Role) -> UserId {
        store
            .create_user(NewUser {
                name: name.to_string(),
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_string(),
                photo: None,
                role,
            })
            .await
            .unwrap()
            .id
    }

    async fn reader(store: &MemoryStore) -> UserId {
        seed_user(store, "Ada", "ada@example.com", Role::User).await
    }

    fn input(title: &str) -> ComplaintInput {
        ComplaintInput {
            title: Some(title.to_string()),
            description: Some("  The spine was cracked on arrival.  ".to_string()),
            ..ComplaintInput::default()
        }
    }

    #[tokio::test]
    async fn test_submit_applies_defaults() {
        let store = MemoryStore::new();
        let complaints = ComplaintService::new(&store);
        let user = reader(&store).await;

        let complaint = complaints.submit(user, input("Damaged book")).await.unwrap();
        assert_eq!(complaint.kind, ComplaintType::Complaint);
        assert_eq!(complaint.priority, ComplaintPriority::Medium);
        assert_eq!(complaint.status, ComplaintStatus::Pending);
        assert_eq!(complaint.category, ComplaintCategory::Other);
        assert_eq!(complaint.description, "The spine was cracked on arrival.");
    }

    #[tokio::test]
    async fn test_submit_validates_lengths() {
        let store = MemoryStore::new();
        let complaints = ComplaintService::new(&store);
        let user = reader(&store).await;

        assert!(matches!(
            complaints.submit(user, input("   ")).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            complaints.submit(user, input(&"x".repeat(201))).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(complaints.submit(user, input(&"x".repeat(200))).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_account_cannot_submit() {
        let store = MemoryStore::new();
        let complaints = ComplaintService::new(&store);

        assert!(matches!(
            complaints.submit(UserId::new(9999), input("Late")).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(complaints.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_other_users_complaint_is_hidden() {
        let store = MemoryStore::new();
        let complaints = ComplaintService::new(&store);
        let owner = reader(&store).await;
        let complaint = complaints.submit(owner, input("Late")).await.unwrap();

        assert!(complaints.get_for_user(owner, complaint.id).await.is_ok());
        assert!(matches!(
            complaints.get_for_user(UserId::new(2), complaint.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_response_stamps_responder() {
        let store = MemoryStore::new();
        let complaints = ComplaintService::new(&store);
        let user = reader(&store).await;
        let admin = seed_user(&store, "Store Admin", "admin@example.com", Role::Admin).await;
        let complaint = complaints.submit(user, input("Late")).await.unwrap();

        let updated = complaints
            .update(
                complaint.id,
                admin,
                ComplaintUpdateInput {
                    status: Some(ComplaintStatus::Resolved),
                    admin_response: Some(" Refund issued ".to_string()),
                    ..ComplaintUpdateInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.complaint.status, ComplaintStatus::Resolved);
        assert_eq!(
            updated.complaint.admin_response.as_deref(),
            Some("Refund issued")
        );
        assert_eq!(updated.complaint.responded_by, Some(admin));
        assert!(updated.complaint.responded_at.is_some());
        assert!(updated.complaint.updated_at >= complaint.updated_at);
        assert_eq!(
            updated.responder.map(|r| r.name).as_deref(),
            Some("Store Admin")
        );

        let stats = complaints.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.by_type.get("complaint"), Some(&1));
    }

    #[tokio::test]
    async fn test_admin_views_name_the_accounts() {
        let store = MemoryStore::new();
        let complaints = ComplaintService::new(&store);
        let user = reader(&store).await;
        let complaint = complaints.submit(user, input("Late")).await.unwrap();

        let listed = complaints.list(ComplaintFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        let submitter = listed[0].user.as_ref().unwrap();
        assert_eq!(submitter.name, "Ada");
        assert_eq!(submitter.email.as_str(), "ada@example.com");
        assert_eq!(listed[0].responder, None);

        let shown = complaints.get(complaint.id).await.unwrap();
        assert_eq!(shown.complaint, complaint);
        assert_eq!(shown.user.map(|u| u.id), Some(user));

        let json = serde_json::to_value(&listed[0]).unwrap();
        assert_eq!(json["title"], "Late");
        assert_eq!(json["user"]["email"], "ada@example.com");
        assert!(json["responder"].is_null());
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let store = MemoryStore::new();
        let complaints = ComplaintService::new(&store);
        let user = reader(&store).await;
        let complaint = complaints.submit(user, input("Late")).await.unwrap();

        assert!(matches!(
            complaints
                .update(complaint.id, UserId::new(9), ComplaintUpdateInput::default())
                .await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
