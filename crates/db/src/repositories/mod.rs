use async_trait::async_trait;
use thiserror::Error;

use agora_core::domain::account::Account;
use agora_core::domain::hosted_service::{HostedService, HostedServiceId};
use agora_core::domain::listing::{ApprovedListing, ListingId, ResourceType};
use agora_core::domain::payment::PaymentRecord;
use agora_core::domain::publisher::{Publisher, PublisherId};
use agora_core::domain::submission::{SubmissionId, SubmissionRequest, SubmissionStatus};

pub mod account;
pub mod hosted_service;
pub mod listing;
pub mod memory;
pub mod payment;
pub mod publisher;
pub mod submission;

pub use account::SqlAccountRepository;
pub use hosted_service::SqlHostedServiceRepository;
pub use listing::SqlListingRepository;
pub use memory::{InMemoryListingRepository, InMemoryPaymentRepository, InMemorySubmissionRepository};
pub use payment::SqlPaymentRepository;
pub use publisher::SqlPublisherRepository;
pub use submission::SqlSubmissionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<SubmissionRequest>, RepositoryError>;

    async fn save(&self, request: SubmissionRequest) -> Result<(), RepositoryError>;

    /// Remove a withdrawn request. Returns whether a row was deleted.
    async fn delete(&self, id: &SubmissionId) -> Result<bool, RepositoryError>;

    async fn list_by_status(
        &self,
        status: Option<SubmissionStatus>,
        limit: u32,
    ) -> Result<Vec<SubmissionRequest>, RepositoryError>;
}

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn find_by_id(&self, id: &ListingId)
        -> Result<Option<ApprovedListing>, RepositoryError>;

    async fn save(&self, listing: ApprovedListing) -> Result<(), RepositoryError>;

    async fn list_published(
        &self,
        resource_type: Option<ResourceType>,
        search: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ApprovedListing>, RepositoryError>;
}

#[async_trait]
pub trait PublisherRepository: Send + Sync {
    async fn find_by_id(&self, id: &PublisherId) -> Result<Option<Publisher>, RepositoryError>;
    async fn save(&self, publisher: Publisher) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn save(&self, account: Account) -> Result<(), RepositoryError>;
    async fn list_all(&self, limit: u32) -> Result<Vec<Account>, RepositoryError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn save(&self, payment: PaymentRecord) -> Result<(), RepositoryError>;
    async fn list_all(&self, limit: u32) -> Result<Vec<PaymentRecord>, RepositoryError>;
}

#[async_trait]
pub trait HostedServiceRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &HostedServiceId,
    ) -> Result<Option<HostedService>, RepositoryError>;

    async fn save(&self, service: HostedService) -> Result<(), RepositoryError>;

    async fn list_all(&self, limit: u32) -> Result<Vec<HostedService>, RepositoryError>;
}
