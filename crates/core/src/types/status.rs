//! Role and status enums for accounts, orders and complaints.
//!
//! All of these are stored as `TEXT` and travel over JSON as the same
//! lower-case (kebab-case where multi-word) strings, e.g. `"in-progress"`.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown enum value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `Display`, `FromStr` and `ALL` for a fieldless enum.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored and serialized form.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Accounts
// =============================================================================

/// Account role.
///
/// Exactly one `Admin` may exist system-wide; the database enforces this with
/// a partial unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

text_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
});

impl Role {
    /// Whether this role may use the catalog, order and complaint admin routes.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Fulfillment status of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Shipped => "shipped",
    Delivered => "delivered",
});

// =============================================================================
// Complaints
// =============================================================================

/// Kind of feedback a user is submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintType {
    #[default]
    Complaint,
    Feedback,
    Suggestion,
    BugReport,
}

text_enum!(ComplaintType, "complaint type", {
    Complaint => "complaint",
    Feedback => "feedback",
    Suggestion => "suggestion",
    BugReport => "bug-report",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

text_enum!(ComplaintPriority, "complaint priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Workflow state of a complaint; only admins move it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Closed,
}

text_enum!(ComplaintStatus, "complaint status", {
    Pending => "pending",
    InProgress => "in-progress",
    Resolved => "resolved",
    Closed => "closed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintCategory {
    OrderIssue,
    BookQuality,
    WebsiteIssue,
    PaymentIssue,
    DeliveryIssue,
    #[default]
    Other,
}

text_enum!(ComplaintCategory, "complaint category", {
    OrderIssue => "order-issue",
    BookQuality => "book-quality",
    WebsiteIssue => "website-issue",
    PaymentIssue => "payment-issue",
    DeliveryIssue => "delivery-issue",
    Other => "other",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capability() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_serde_matches_stored_text() {
        // The TEXT column and the JSON body must agree for every variant.
        for status in ComplaintStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        for category in ComplaintCategory::ALL {
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
        for kind in ComplaintType::ALL {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_parse_unknown_value() {
        let err = "cancelled".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.to_string(), "invalid order status: cancelled");
    }

    #[test]
    fn test_parse_kebab_case() {
        assert_eq!(
            "in-progress".parse::<ComplaintStatus>().unwrap(),
            ComplaintStatus::InProgress
        );
        assert_eq!(
            "bug-report".parse::<ComplaintType>().unwrap(),
            ComplaintType::BugReport
        );
    }

    #[test]
    fn test_complaint_defaults() {
        assert_eq!(ComplaintType::default(), ComplaintType::Complaint);
        assert_eq!(ComplaintPriority::default(), ComplaintPriority::Medium);
        assert_eq!(ComplaintStatus::default(), ComplaintStatus::Pending);
        assert_eq!(ComplaintCategory::default(), ComplaintCategory::Other);
    }
}
