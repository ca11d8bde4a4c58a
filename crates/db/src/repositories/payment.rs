use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use agora_core::domain::account::AccountId;
use agora_core::domain::listing::ListingId;
use agora_core::domain::payment::{PaymentId, PaymentRecord, PaymentStatus};

use super::{PaymentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPaymentRepository {
    pool: DbPool,
}

impl SqlPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn status_as_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Settled => "settled",
        PaymentStatus::Refunded => "refunded",
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, RepositoryError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "settled" => Ok(PaymentStatus::Settled),
        "refunded" => Ok(PaymentStatus::Refunded),
        other => Err(RepositoryError::Decode(format!("unknown payment status `{other}`"))),
    }
}

fn row_to_payment(row: &sqlx::sqlite::SqliteRow) -> Result<PaymentRecord, RepositoryError> {
    let get = |column: &str| -> Result<String, RepositoryError> {
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    let recorded_at = DateTime::parse_from_rfc3339(&get("recorded_at")?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad `recorded_at` timestamp: {e}")))?;
    let amount_usd = get("amount_usd")?
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("bad payment amount: {e}")))?;

    Ok(PaymentRecord {
        id: PaymentId(get("id")?),
        account_id: AccountId(get("account_id")?),
        listing_id: ListingId(get("listing_id")?),
        amount_usd,
        status: parse_status(&get("status")?)?,
        recorded_at,
    })
}

#[async_trait::async_trait]
impl PaymentRepository for SqlPaymentRepository {
    async fn save(&self, payment: PaymentRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO payment (id, account_id, listing_id, amount_usd, status, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status",
        )
        .bind(&payment.id.0)
        .bind(&payment.account_id.0)
        .bind(&payment.listing_id.0)
        .bind(payment.amount_usd.to_string())
        .bind(status_as_str(payment.status))
        .bind(payment.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, account_id, listing_id, amount_usd, status, recorded_at
             FROM payment ORDER BY recorded_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_payment).collect::<Result<Vec<_>, _>>()
    }
}
