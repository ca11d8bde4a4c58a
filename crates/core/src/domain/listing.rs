use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::publisher::PublisherId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Kind of marketplace resource a listing offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Api,
    Agent,
    Dataset,
}

/// Whether a listing is visible in the public catalog or parked while a
/// basic-information edit is re-reviewed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingVisibility {
    Published,
    PendingReapproval,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub rating: u8,
    pub body: String,
    pub posted_at: DateTime<Utc>,
}

/// A catalog-owned resource. Listings are created by the catalog when a
/// submission is verified; from then on the catalog, not the workflow, owns
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedListing {
    pub id: ListingId,
    pub publisher_id: PublisherId,
    pub title: String,
    pub summary: String,
    pub resource_type: ResourceType,
    pub tags: Vec<String>,
    pub price_usd: Decimal,
    pub documentation: String,
    pub reviews: Vec<Review>,
    pub visibility: ListingVisibility,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
