use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use agora_core::domain::listing::{
    ApprovedListing, ListingId, ListingVisibility, ResourceType, Review,
};
use agora_core::domain::publisher::PublisherId;

use super::{ListingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlListingRepository {
    pool: DbPool,
}

impl SqlListingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn resource_type_as_str(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Api => "api",
        ResourceType::Agent => "agent",
        ResourceType::Dataset => "dataset",
    }
}

fn parse_resource_type(s: &str) -> Result<ResourceType, RepositoryError> {
    match s {
        "api" => Ok(ResourceType::Api),
        "agent" => Ok(ResourceType::Agent),
        "dataset" => Ok(ResourceType::Dataset),
        other => Err(RepositoryError::Decode(format!("unknown resource type `{other}`"))),
    }
}

fn visibility_as_str(visibility: ListingVisibility) -> &'static str {
    match visibility {
        ListingVisibility::Published => "published",
        ListingVisibility::PendingReapproval => "pending_reapproval",
    }
}

fn parse_visibility(s: &str) -> Result<ListingVisibility, RepositoryError> {
    match s {
        "published" => Ok(ListingVisibility::Published),
        "pending_reapproval" => Ok(ListingVisibility::PendingReapproval),
        other => Err(RepositoryError::Decode(format!("unknown listing visibility `{other}`"))),
    }
}

fn get_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_date(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad `{column}` timestamp: {e}")))
}

fn row_to_listing(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovedListing, RepositoryError> {
    let tags: Vec<String> = serde_json::from_str(&get_text(row, "tags")?)
        .map_err(|e| RepositoryError::Decode(format!("bad listing tags: {e}")))?;
    let reviews: Vec<Review> = serde_json::from_str(&get_text(row, "reviews")?)
        .map_err(|e| RepositoryError::Decode(format!("bad listing reviews: {e}")))?;
    let price_usd = get_text(row, "price_usd")?
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("bad listing price: {e}")))?;

    Ok(ApprovedListing {
        id: ListingId(get_text(row, "id")?),
        publisher_id: PublisherId(get_text(row, "publisher_id")?),
        title: get_text(row, "title")?,
        summary: get_text(row, "summary")?,
        resource_type: parse_resource_type(&get_text(row, "resource_type")?)?,
        tags,
        price_usd,
        documentation: get_text(row, "documentation")?,
        reviews,
        visibility: parse_visibility(&get_text(row, "visibility")?)?,
        published_at: parse_date("published_at", &get_text(row, "published_at")?)?,
        updated_at: parse_date("updated_at", &get_text(row, "updated_at")?)?,
    })
}

const SELECT_COLUMNS: &str = "id, publisher_id, title, summary, resource_type, tags, price_usd,
                              documentation, reviews, visibility, published_at, updated_at";

#[async_trait::async_trait]
impl ListingRepository for SqlListingRepository {
    async fn find_by_id(
        &self,
        id: &ListingId,
    ) -> Result<Option<ApprovedListing>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM listing WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_listing(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, listing: ApprovedListing) -> Result<(), RepositoryError> {
        let tags_json = serde_json::to_string(&listing.tags)
            .map_err(|e| RepositoryError::Decode(format!("encode listing tags: {e}")))?;
        let reviews_json = serde_json::to_string(&listing.reviews)
            .map_err(|e| RepositoryError::Decode(format!("encode listing reviews: {e}")))?;

        sqlx::query(
            "INSERT INTO listing (id, publisher_id, title, summary, resource_type, tags,
                                  price_usd, documentation, reviews, visibility, published_at,
                                  updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 summary = excluded.summary,
                 resource_type = excluded.resource_type,
                 tags = excluded.tags,
                 price_usd = excluded.price_usd,
                 documentation = excluded.documentation,
                 reviews = excluded.reviews,
                 visibility = excluded.visibility,
                 updated_at = excluded.updated_at",
        )
        .bind(&listing.id.0)
        .bind(&listing.publisher_id.0)
        .bind(&listing.title)
        .bind(&listing.summary)
        .bind(resource_type_as_str(listing.resource_type))
        .bind(&tags_json)
        .bind(listing.price_usd.to_string())
        .bind(&listing.documentation)
        .bind(&reviews_json)
        .bind(visibility_as_str(listing.visibility))
        .bind(listing.published_at.to_rfc3339())
        .bind(listing.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_published(
        &self,
        resource_type: Option<ResourceType>,
        search: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ApprovedListing>, RepositoryError> {
        let pattern = search.map(|term| format!("%{}%", term.trim()));

        let rows: Vec<sqlx::sqlite::SqliteRow> = match (resource_type, pattern) {
            (Some(resource_type), Some(pattern)) => {
                sqlx::query(&format!(
                    "SELECT {SELECT_COLUMNS} FROM listing
                     WHERE visibility = 'published' AND resource_type = ?
                       AND (title LIKE ? OR summary LIKE ?)
                     ORDER BY published_at DESC LIMIT ?"
                ))
                .bind(resource_type_as_str(resource_type))
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(resource_type), None) => {
                sqlx::query(&format!(
                    "SELECT {SELECT_COLUMNS} FROM listing
                     WHERE visibility = 'published' AND resource_type = ?
                     ORDER BY published_at DESC LIMIT ?"
                ))
                .bind(resource_type_as_str(resource_type))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(pattern)) => {
                sqlx::query(&format!(
                    "SELECT {SELECT_COLUMNS} FROM listing
                     WHERE visibility = 'published' AND (title LIKE ? OR summary LIKE ?)
                     ORDER BY published_at DESC LIMIT ?"
                ))
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query(&format!(
                    "SELECT {SELECT_COLUMNS} FROM listing
                     WHERE visibility = 'published'
                     ORDER BY published_at DESC LIMIT ?"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_listing).collect::<Result<Vec<_>, _>>()
    }
}
