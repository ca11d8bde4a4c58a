use chrono::{DateTime, Utc};
use sqlx::Row;

use agora_core::domain::publisher::{Publisher, PublisherId};

use super::{PublisherRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPublisherRepository {
    pool: DbPool,
}

impl SqlPublisherRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_publisher(row: &sqlx::sqlite::SqliteRow) -> Result<Publisher, RepositoryError> {
    let get = |column: &str| -> Result<String, RepositoryError> {
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    let joined_at = DateTime::parse_from_rfc3339(&get("joined_at")?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad `joined_at` timestamp: {e}")))?;

    Ok(Publisher {
        id: PublisherId(get("id")?),
        name: get("name")?,
        organization: get("organization")?,
        contact_email: get("contact_email")?,
        joined_at,
    })
}

#[async_trait::async_trait]
impl PublisherRepository for SqlPublisherRepository {
    async fn find_by_id(&self, id: &PublisherId) -> Result<Option<Publisher>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, organization, contact_email, joined_at FROM publisher WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_publisher(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, publisher: Publisher) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO publisher (id, name, organization, contact_email, joined_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 organization = excluded.organization,
                 contact_email = excluded.contact_email",
        )
        .bind(&publisher.id.0)
        .bind(&publisher.name)
        .bind(&publisher.organization)
        .bind(&publisher.contact_email)
        .bind(publisher.joined_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
