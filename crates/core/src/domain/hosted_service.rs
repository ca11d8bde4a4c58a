use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::publisher::PublisherId;
use crate::domain::submission::UpdateCadence;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostedServiceId(pub String);

/// Platform-hosted data infrastructure activated from a verified hosting
/// request. Managed from the admin back-office, never shown in the public
/// catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedService {
    pub id: HostedServiceId,
    pub publisher_id: PublisherId,
    pub organization: String,
    pub dataset_name: String,
    pub capacity_gb: u32,
    pub update_cadence: UpdateCadence,
    pub active: bool,
    pub activated_at: DateTime<Utc>,
}
