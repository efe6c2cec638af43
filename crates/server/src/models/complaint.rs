//! Complaint and feedback types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookstore_core::{
    ComplaintCategory, ComplaintId, ComplaintPriority, ComplaintStatus, ComplaintType, UserId,
};

use super::UserSummary;

/// Longest accepted complaint title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;
/// Longest accepted complaint description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: ComplaintId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ComplaintType,
    pub priority: ComplaintPriority,
    pub status: ComplaintStatus,
    pub category: ComplaintCategory,
    pub admin_response: Option<String>,
    pub responded_by: Option<UserId>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    /// Apply an admin update stamped at `now`.
    ///
    /// `updated_at` always moves; a response also records who answered and when.
    pub fn apply(&mut self, update: &ComplaintUpdate, responder: UserId, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(response) = &update.admin_response {
            self.admin_response = Some(response.clone());
            self.responded_by = Some(responder);
            self.responded_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// A complaint as admins see it: the stored record plus who filed it and
/// who answered. Either account may have been removed since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminComplaint {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub user: Option<UserSummary>,
    pub responder: Option<UserSummary>,
}

/// Validated input for a new complaint. Status always starts as pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub kind: ComplaintType,
    pub priority: ComplaintPriority,
    pub category: ComplaintCategory,
}

/// Admin update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintUpdate {
    pub status: Option<ComplaintStatus>,
    pub priority: Option<ComplaintPriority>,
    pub admin_response: Option<String>,
}

/// Admin listing filter; every set field must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    #[serde(rename = "type")]
    pub kind: Option<ComplaintType>,
    pub priority: Option<ComplaintPriority>,
    pub category: Option<ComplaintCategory>,
}

impl ComplaintFilter {
    #[must_use]
    pub fn matches(&self, complaint: &Complaint) -> bool {
        self.status.is_none_or(|s| s == complaint.status)
            && self.kind.is_none_or(|k| k == complaint.kind)
            && self.priority.is_none_or(|p| p == complaint.priority)
            && self.category.is_none_or(|c| c == complaint.category)
    }
}

/// Complaint counts for the admin overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
    /// Keyed by the stored type name, e.g. `bug-report`.
    pub by_type: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
}

impl ComplaintStats {
    /// Count one complaint into the totals.
    pub fn record(&mut self, complaint: &Complaint) {
        self.add(complaint.kind, complaint.status, complaint.category, 1);
    }

    /// Count `count` complaints sharing the same type, status and category.
    pub fn add(
        &mut self,
        kind: ComplaintType,
        status: ComplaintStatus,
        category: ComplaintCategory,
        count: i64,
    ) {
        self.total += count;
        match status {
            ComplaintStatus::Pending => self.pending += count,
            ComplaintStatus::InProgress => self.in_progress += count,
            ComplaintStatus::Resolved => self.resolved += count,
            ComplaintStatus::Closed => {}
        }
        *self.by_type.entry(kind.as_str().to_owned()).or_default() += count;
        *self
            .by_category
            .entry(category.as_str().to_owned())
            .or_default() += count;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Complaint {
        let created = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Complaint {
            id: ComplaintId::new(1),
            user_id: UserId::new(2),
            title: "Torn cover".to_string(),
            description: "The cover arrived torn".to_string(),
            kind: ComplaintType::Complaint,
            priority: ComplaintPriority::Medium,
            status: ComplaintStatus::Pending,
            category: ComplaintCategory::BookQuality,
            admin_response: None,
            responded_by: None,
            responded_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_status_only_update_leaves_response_unset() {
        let mut complaint = sample();
        let now = Utc::now();
        complaint.apply(
            &ComplaintUpdate {
                status: Some(ComplaintStatus::InProgress),
                ..ComplaintUpdate::default()
            },
            UserId::new(1),
            now,
        );
        assert_eq!(complaint.status, ComplaintStatus::InProgress);
        assert_eq!(complaint.responded_by, None);
        assert_eq!(complaint.updated_at, now);
    }

    #[test]
    fn test_response_stamps_responder() {
        let mut complaint = sample();
        let now = Utc::now();
        complaint.apply(
            &ComplaintUpdate {
                admin_response: Some("Replacement shipped".to_string()),
                ..ComplaintUpdate::default()
            },
            UserId::new(1),
            now,
        );
        assert_eq!(complaint.responded_by, Some(UserId::new(1)));
        assert_eq!(complaint.responded_at, Some(now));
    }

    #[test]
    fn test_filter_matches_all_set_fields() {
        let complaint = sample();
        let filter = ComplaintFilter {
            status: Some(ComplaintStatus::Pending),
            category: Some(ComplaintCategory::BookQuality),
            ..ComplaintFilter::default()
        };
        assert!(filter.matches(&complaint));
        let filter = ComplaintFilter {
            kind: Some(ComplaintType::Feedback),
            ..filter
        };
        assert!(!filter.matches(&complaint));
    }

    #[test]
    fn test_stats_record() {
        let mut stats = ComplaintStats::default();
        let mut complaint = sample();
        stats.record(&complaint);
        complaint.status = ComplaintStatus::Resolved;
        complaint.kind = ComplaintType::BugReport;
        stats.record(&complaint);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.by_type.get("bug-report"), Some(&1));
        assert_eq!(stats.by_category.get("book-quality"), Some(&2));
    }
}
