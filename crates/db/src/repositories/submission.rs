use chrono::{DateTime, Utc};
use sqlx::Row;

use agora_core::domain::submission::{
    RequestKind, SubmissionDetails, SubmissionId, SubmissionRequest, SubmissionSnapshot,
    SubmissionStatus, ThreadMessage,
};

use super::{RepositoryError, SubmissionRepository};
use crate::DbPool;

pub struct SqlSubmissionRepository {
    pool: DbPool,
}

impl SqlSubmissionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(s: &str) -> Result<SubmissionStatus, RepositoryError> {
    match s {
        "submitted" => Ok(SubmissionStatus::Submitted),
        "verifying" => Ok(SubmissionStatus::Verifying),
        "verified" => Ok(SubmissionStatus::Verified),
        "rejected" => Ok(SubmissionStatus::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown submission status `{other}`"))),
    }
}

pub fn status_as_str(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Submitted => "submitted",
        SubmissionStatus::Verifying => "verifying",
        SubmissionStatus::Verified => "verified",
        SubmissionStatus::Rejected => "rejected",
    }
}

fn kind_as_str(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::GeneralListing => "general_listing",
        RequestKind::HostedService => "hosted_service",
    }
}

fn get_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn get_opt_text(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<String>, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_date(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad `{column}` timestamp: {e}")))
}

fn parse_opt_date(
    column: &str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.map(|value| parse_date(column, &value)).transpose()
}

fn row_to_submission(row: &sqlx::sqlite::SqliteRow) -> Result<SubmissionRequest, RepositoryError> {
    let details_json = get_text(row, "details")?;
    let details: SubmissionDetails = serde_json::from_str(&details_json)
        .map_err(|e| RepositoryError::Decode(format!("bad submission details: {e}")))?;

    let messages_json = get_text(row, "messages")?;
    let messages: Vec<ThreadMessage> = serde_json::from_str(&messages_json)
        .map_err(|e| RepositoryError::Decode(format!("bad message thread: {e}")))?;

    let status = parse_status(&get_text(row, "status")?)?;
    let is_reapproval: i64 =
        row.try_get("is_reapproval").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let snapshot = SubmissionSnapshot {
        id: get_text(row, "id")?,
        publisher_id: get_text(row, "publisher_id")?,
        details,
        status,
        submitted_at: parse_date("submitted_at", &get_text(row, "submitted_at")?)?,
        verifying_at: parse_opt_date("verifying_at", get_opt_text(row, "verifying_at")?)?,
        verified_at: parse_opt_date("verified_at", get_opt_text(row, "verified_at")?)?,
        rejected_at: parse_opt_date("rejected_at", get_opt_text(row, "rejected_at")?)?,
        rejection_reason: get_opt_text(row, "rejection_reason")?,
        messages,
        is_reapproval: is_reapproval != 0,
        target_listing_id: get_opt_text(row, "target_listing_id")?,
    };

    SubmissionRequest::try_from(snapshot).map_err(|e| RepositoryError::Decode(e.to_string()))
}

const SELECT_COLUMNS: &str = "id, publisher_id, kind, details, status, submitted_at, verifying_at,
                              verified_at, rejected_at, rejection_reason, messages, is_reapproval,
                              target_listing_id";

#[async_trait::async_trait]
impl SubmissionRepository for SqlSubmissionRepository {
    async fn find_by_id(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<SubmissionRequest>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM submission_request WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_submission(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: SubmissionRequest) -> Result<(), RepositoryError> {
        let kind = kind_as_str(request.kind());
        let status = status_as_str(request.status());
        let snapshot = SubmissionSnapshot::from(request);

        let details_json = serde_json::to_string(&snapshot.details)
            .map_err(|e| RepositoryError::Decode(format!("encode submission details: {e}")))?;
        let messages_json = serde_json::to_string(&snapshot.messages)
            .map_err(|e| RepositoryError::Decode(format!("encode message thread: {e}")))?;

        sqlx::query(
            "INSERT INTO submission_request (id, publisher_id, kind, details, status, submitted_at,
                                             verifying_at, verified_at, rejected_at,
                                             rejection_reason, messages, is_reapproval,
                                             target_listing_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 details = excluded.details,
                 status = excluded.status,
                 verifying_at = excluded.verifying_at,
                 verified_at = excluded.verified_at,
                 rejected_at = excluded.rejected_at,
                 rejection_reason = excluded.rejection_reason,
                 messages = excluded.messages",
        )
        .bind(&snapshot.id)
        .bind(&snapshot.publisher_id)
        .bind(kind)
        .bind(&details_json)
        .bind(status)
        .bind(snapshot.submitted_at.to_rfc3339())
        .bind(snapshot.verifying_at.map(|dt| dt.to_rfc3339()))
        .bind(snapshot.verified_at.map(|dt| dt.to_rfc3339()))
        .bind(snapshot.rejected_at.map(|dt| dt.to_rfc3339()))
        .bind(&snapshot.rejection_reason)
        .bind(&messages_json)
        .bind(i64::from(snapshot.is_reapproval))
        .bind(&snapshot.target_listing_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &SubmissionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM submission_request WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_status(
        &self,
        status: Option<SubmissionStatus>,
        limit: u32,
    ) -> Result<Vec<SubmissionRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if let Some(status) = status {
            sqlx::query(&format!(
                "SELECT {SELECT_COLUMNS} FROM submission_request
                 WHERE status = ? ORDER BY submitted_at ASC LIMIT ?"
            ))
            .bind(status_as_str(status))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {SELECT_COLUMNS} FROM submission_request
                 ORDER BY submitted_at ASC LIMIT ?"
            ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_submission).collect::<Result<Vec<_>, _>>()
    }
}
