use chrono::{DateTime, Utc};
use sqlx::Row;

use agora_core::domain::hosted_service::{HostedService, HostedServiceId};
use agora_core::domain::publisher::PublisherId;
use agora_core::domain::submission::UpdateCadence;

use super::{HostedServiceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHostedServiceRepository {
    pool: DbPool,
}

impl SqlHostedServiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn cadence_as_str(cadence: UpdateCadence) -> &'static str {
    match cadence {
        UpdateCadence::Realtime => "realtime",
        UpdateCadence::Daily => "daily",
        UpdateCadence::Weekly => "weekly",
        UpdateCadence::Monthly => "monthly",
    }
}

fn parse_cadence(s: &str) -> Result<UpdateCadence, RepositoryError> {
    match s {
        "realtime" => Ok(UpdateCadence::Realtime),
        "daily" => Ok(UpdateCadence::Daily),
        "weekly" => Ok(UpdateCadence::Weekly),
        "monthly" => Ok(UpdateCadence::Monthly),
        other => Err(RepositoryError::Decode(format!("unknown update cadence `{other}`"))),
    }
}

fn row_to_service(row: &sqlx::sqlite::SqliteRow) -> Result<HostedService, RepositoryError> {
    let get = |column: &str| -> Result<String, RepositoryError> {
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    let activated_at = DateTime::parse_from_rfc3339(&get("activated_at")?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad `activated_at` timestamp: {e}")))?;
    let capacity_gb: i64 =
        row.try_get("capacity_gb").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: i64 = row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(HostedService {
        id: HostedServiceId(get("id")?),
        publisher_id: PublisherId(get("publisher_id")?),
        organization: get("organization")?,
        dataset_name: get("dataset_name")?,
        capacity_gb: u32::try_from(capacity_gb)
            .map_err(|_| RepositoryError::Decode(format!("bad capacity `{capacity_gb}`")))?,
        update_cadence: parse_cadence(&get("update_cadence")?)?,
        active: active != 0,
        activated_at,
    })
}

#[async_trait::async_trait]
impl HostedServiceRepository for SqlHostedServiceRepository {
    async fn find_by_id(
        &self,
        id: &HostedServiceId,
    ) -> Result<Option<HostedService>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, publisher_id, organization, dataset_name, capacity_gb, update_cadence,
                    active, activated_at
             FROM hosted_service WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_service(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, service: HostedService) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO hosted_service (id, publisher_id, organization, dataset_name,
                                         capacity_gb, update_cadence, active, activated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 organization = excluded.organization,
                 dataset_name = excluded.dataset_name,
                 capacity_gb = excluded.capacity_gb,
                 update_cadence = excluded.update_cadence,
                 active = excluded.active",
        )
        .bind(&service.id.0)
        .bind(&service.publisher_id.0)
        .bind(&service.organization)
        .bind(&service.dataset_name)
        .bind(i64::from(service.capacity_gb))
        .bind(cadence_as_str(service.update_cadence))
        .bind(i64::from(service.active))
        .bind(service.activated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<HostedService>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, publisher_id, organization, dataset_name, capacity_gb, update_cadence,
                    active, activated_at
             FROM hosted_service ORDER BY activated_at ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_service).collect::<Result<Vec<_>, _>>()
    }
}
