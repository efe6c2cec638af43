//! Complaint repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bookstore_core::{
    ComplaintCategory, ComplaintId, ComplaintPriority, ComplaintStatus, ComplaintType, UserId,
};

use super::{RepositoryError, parse_column};
use crate::models::{Complaint, ComplaintFilter, ComplaintStats, ComplaintUpdate, NewComplaint};

const COMPLAINT_COLUMNS: &str = "id, user_id, title, description, kind, priority, status, \
     category, admin_response, responded_by, responded_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ComplaintRow {
    id: ComplaintId,
    user_id: UserId,
    title: String,
    description: String,
    kind: String,
    priority: String,
    status: String,
    category: String,
    admin_response: Option<String>,
    responded_by: Option<UserId>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ComplaintRow> for Complaint {
    type Error = RepositoryError;

    fn try_from(r: ComplaintRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            description: r.description,
            kind: parse_column::<ComplaintType>("complaint type", &r.kind)?,
            priority: parse_column::<ComplaintPriority>("complaint priority", &r.priority)?,
            status: parse_column::<ComplaintStatus>("complaint status", &r.status)?,
            category: parse_column::<ComplaintCategory>("complaint category", &r.category)?,
            admin_response: r.admin_response,
            responded_by: r.responded_by,
            responded_at: r.responded_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    kind: String,
    status: String,
    category: String,
    count: i64,
}

/// Repository for complaints and feedback.
pub struct ComplaintRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ComplaintRepository<'a> {
    /// Create a new complaint repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// File a new complaint with status `pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user: UserId,
        complaint: &NewComplaint,
    ) -> Result<Complaint, RepositoryError> {
        let row = sqlx::query_as::<_, ComplaintRow>(&format!(
            r"
            INSERT INTO complaint (user_id, title, description, kind, priority, status, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COMPLAINT_COLUMNS}
            "
        ))
        .bind(user)
        .bind(&complaint.title)
        .bind(&complaint.description)
        .bind(complaint.kind.as_str())
        .bind(complaint.priority.as_str())
        .bind(ComplaintStatus::Pending.as_str())
        .bind(complaint.category.as_str())
        .fetch_one(self.pool)
        .await?;

        Complaint::try_from(row)
    }

    /// The user's complaints, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Complaint>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Complaint::try_from).collect()
    }

    /// Get a complaint by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        let row = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Complaint::try_from).transpose()
    }

    /// Complaints matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            r"
            SELECT {COMPLAINT_COLUMNS}
            FROM complaint
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR kind = $2)
              AND ($3::text IS NULL OR priority = $3)
              AND ($4::text IS NULL OR category = $4)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(filter.category.map(|c| c.as_str()))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Complaint::try_from).collect()
    }

    /// Apply an admin update.
    ///
    /// `updated_at` is always set to `now`; a response also stamps
    /// `responded_by` and `responded_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: ComplaintId,
        update: &ComplaintUpdate,
        responder: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Complaint>, RepositoryError> {
        let row = sqlx::query_as::<_, ComplaintRow>(&format!(
            r"
            UPDATE complaint SET
                status = COALESCE($2, status),
                priority = COALESCE($3, priority),
                admin_response = COALESCE($4, admin_response),
                responded_by = CASE WHEN $4::text IS NULL THEN responded_by ELSE $5 END,
                responded_at = CASE WHEN $4::text IS NULL THEN responded_at ELSE $6 END,
                updated_at = $6
            WHERE id = $1
            RETURNING {COMPLAINT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.priority.map(|p| p.as_str()))
        .bind(&update.admin_response)
        .bind(responder)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        row.map(Complaint::try_from).transpose()
    }

    /// Delete a complaint.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ComplaintId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM complaint WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts by status, type and category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<ComplaintStats, RepositoryError> {
        let rows = sqlx::query_as::<_, StatsRow>(
            r"
            SELECT kind, status, category, COUNT(*) AS count
            FROM complaint
            GROUP BY kind, status, category
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mut stats = ComplaintStats::default();
        for row in rows {
            stats.add(
                parse_column("complaint type", &row.kind)?,
                parse_column("complaint status", &row.status)?,
                parse_column("complaint category", &row.category)?,
                row.count,
            );
        }
        Ok(stats)
    }
}
