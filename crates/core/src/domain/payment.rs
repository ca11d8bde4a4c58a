use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::listing::ListingId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Settled,
    Refunded,
}

/// A purchase record tying an account to a listing it bought access to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub account_id: AccountId,
    pub listing_id: ListingId,
    pub amount_usd: Decimal,
    pub status: PaymentStatus,
    pub recorded_at: DateTime<Utc>,
}
