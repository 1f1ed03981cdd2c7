//! Database repository for CRUD operations.
//!
//! Uses prepared statements and row-mapper helpers; this is the production
//! implementation of the `SubmissionStore` seam.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateSubmissionRequest, JoinType, Membership, MembershipStatus, Platform, Submission,
    SubmissionStatus,
};
use crate::sync::SubmissionStore;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

const SUBMISSION_COLUMNS: &str = "id, name, platform, category, description, full_description, \
     join_link, join_type, price, founder_name, founder_bio, logo_url, status, created_at, \
     reviewed_at, review_notes";

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== SUBMISSION OPERATIONS ====================

    /// Create a new submission from the public form.
    pub async fn create_submission(
        &self,
        request: &CreateSubmissionRequest,
    ) -> Result<Submission, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO submissions (id, name, platform, category, description, full_description, \
             join_link, join_type, price, founder_name, founder_bio, logo_url, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(request.platform.as_str())
        .bind(&request.category)
        .bind(&request.description)
        .bind(&request.full_description)
        .bind(&request.join_link)
        .bind(request.join_type.as_str())
        .bind(request.price)
        .bind(&request.founder_name)
        .bind(&request.founder_bio)
        .bind(&request.logo_url)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Submission {
            id,
            name: request.name.clone(),
            platform: request.platform,
            category: request.category.clone(),
            description: request.description.clone(),
            full_description: request.full_description.clone(),
            join_link: request.join_link.clone(),
            join_type: request.join_type,
            price: request.price,
            founder_name: request.founder_name.clone(),
            founder_bio: request.founder_bio.clone(),
            logo_url: request.logo_url.clone(),
            status: SubmissionStatus::Pending,
            created_at: now,
            reviewed_at: None,
            review_notes: None,
        })
    }

    /// List all submissions, newest first.
    pub async fn list_submissions(&self) -> Result<Vec<Submission>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(submission_from_row).collect()
    }

    /// Delete a submission. Destructive admin action, outside the normal
    /// review flow.
    pub async fn delete_submission(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Submission {} not found", id)));
        }
        Ok(())
    }

    // ==================== MEMBERSHIP OPERATIONS ====================

    /// Create a pending membership for a paid community join.
    pub async fn create_membership(
        &self,
        community_id: &str,
        member_email: &str,
        amount: i64,
    ) -> Result<Membership, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let order_id = format!("order_{}", uuid::Uuid::new_v4().simple());
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO memberships (id, community_id, member_email, order_id, amount, status, created_at) \
             VALUES (?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&id)
        .bind(community_id)
        .bind(member_email)
        .bind(&order_id)
        .bind(amount)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Membership {
            id,
            community_id: community_id.to_string(),
            member_email: member_email.to_string(),
            order_id,
            amount,
            status: MembershipStatus::Pending,
            created_at: now,
            activated_at: None,
        })
    }

    /// Look up a membership by its gateway order id.
    pub async fn get_membership_by_order(
        &self,
        order_id: &str,
    ) -> Result<Option<Membership>, AppError> {
        let row = sqlx::query(
            "SELECT id, community_id, member_email, order_id, amount, status, created_at, \
             activated_at FROM memberships WHERE order_id = ?",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(membership_from_row).transpose()
    }

    /// Mark a membership active after a confirmed payment.
    pub async fn activate_membership(&self, order_id: &str) -> Result<Membership, AppError> {
        let now = Utc::now().to_rfc3339();
        let result =
            sqlx::query("UPDATE memberships SET status = 'active', activated_at = ? WHERE order_id = ?")
                .bind(&now)
                .bind(order_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Membership for order {} not found",
                order_id
            )));
        }

        self.get_membership_by_order(order_id).await?.ok_or_else(|| {
            AppError::Internal(format!("Membership for order {} vanished", order_id))
        })
    }
}

#[async_trait]
impl SubmissionStore for Repository {
    /// Get a submission by ID. A missing row is a non-error condition.
    async fn get_submission(&self, id: &str) -> Result<Option<Submission>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(submission_from_row).transpose()
    }

    /// List submissions with the given status, newest first.
    async fn list_by_status(
        &self,
        status: SubmissionStatus,
    ) -> Result<Vec<Submission>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE status = ? ORDER BY created_at DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(submission_from_row).collect()
    }

    /// Partial status write: status, reviewed_at, review_notes only.
    async fn update_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        reviewed_at: &str,
        notes: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE submissions SET status = ?, reviewed_at = ?, review_notes = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(reviewed_at)
        .bind(notes)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Submission {} not found", id)));
        }
        Ok(())
    }
}

/// Map a database row to a Submission.
fn submission_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Submission, AppError> {
    let platform: String = row.get("platform");
    let join_type: String = row.get("join_type");
    let status: String = row.get("status");

    Ok(Submission {
        id: row.get("id"),
        name: row.get("name"),
        platform: Platform::from_str(&platform)
            .ok_or_else(|| AppError::Internal(format!("Unknown platform {}", platform)))?,
        category: row.get("category"),
        description: row.get("description"),
        full_description: row.get("full_description"),
        join_link: row.get("join_link"),
        join_type: JoinType::from_str(&join_type)
            .ok_or_else(|| AppError::Internal(format!("Unknown join type {}", join_type)))?,
        price: row.get("price"),
        founder_name: row.get("founder_name"),
        founder_bio: row.get("founder_bio"),
        logo_url: row.get("logo_url"),
        status: SubmissionStatus::from_str(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown status {}", status)))?,
        created_at: row.get("created_at"),
        reviewed_at: row.get("reviewed_at"),
        review_notes: row.get("review_notes"),
    })
}

/// Map a database row to a Membership.
fn membership_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Membership, AppError> {
    let status: String = row.get("status");

    Ok(Membership {
        id: row.get("id"),
        community_id: row.get("community_id"),
        member_email: row.get("member_email"),
        order_id: row.get("order_id"),
        amount: row.get("amount"),
        status: MembershipStatus::from_str(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown membership status {}", status)))?,
        created_at: row.get("created_at"),
        activated_at: row.get("activated_at"),
    })
}
