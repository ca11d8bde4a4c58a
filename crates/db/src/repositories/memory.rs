use std::collections::HashMap;

use tokio::sync::RwLock;

use agora_core::domain::listing::{ApprovedListing, ListingId, ListingVisibility, ResourceType};
use agora_core::domain::payment::PaymentRecord;
use agora_core::domain::submission::{SubmissionId, SubmissionRequest, SubmissionStatus};

use super::{ListingRepository, PaymentRepository, RepositoryError, SubmissionRepository};

#[derive(Default)]
pub struct InMemorySubmissionRepository {
    requests: RwLock<HashMap<String, SubmissionRequest>>,
}

#[async_trait::async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn find_by_id(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<SubmissionRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn save(&self, request: SubmissionRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id().0.clone(), request);
        Ok(())
    }

    async fn delete(&self, id: &SubmissionId) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        Ok(requests.remove(&id.0).is_some())
    }

    async fn list_by_status(
        &self,
        status: Option<SubmissionStatus>,
        limit: u32,
    ) -> Result<Vec<SubmissionRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<SubmissionRequest> = requests
            .values()
            .filter(|request| status.map_or(true, |status| request.status() == status))
            .cloned()
            .collect();
        matching.sort_by_key(|request| request.dates().submitted());
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: RwLock<HashMap<String, ApprovedListing>>,
}

#[async_trait::async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn find_by_id(
        &self,
        id: &ListingId,
    ) -> Result<Option<ApprovedListing>, RepositoryError> {
        let listings = self.listings.read().await;
        Ok(listings.get(&id.0).cloned())
    }

    async fn save(&self, listing: ApprovedListing) -> Result<(), RepositoryError> {
        let mut listings = self.listings.write().await;
        listings.insert(listing.id.0.clone(), listing);
        Ok(())
    }

    async fn list_published(
        &self,
        resource_type: Option<ResourceType>,
        search: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ApprovedListing>, RepositoryError> {
        let term = search.map(|term| term.trim().to_ascii_lowercase());
        let listings = self.listings.read().await;
        let mut matching: Vec<ApprovedListing> = listings
            .values()
            .filter(|listing| listing.visibility == ListingVisibility::Published)
            .filter(|listing| {
                resource_type.map_or(true, |resource_type| listing.resource_type == resource_type)
            })
            .filter(|listing| {
                term.as_deref().map_or(true, |term| {
                    listing.title.to_ascii_lowercase().contains(term)
                        || listing.summary.to_ascii_lowercase().contains(term)
                })
            })
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.published_at.cmp(&left.published_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<HashMap<String, PaymentRecord>>,
}

#[async_trait::async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: PaymentRecord) -> Result<(), RepositoryError> {
        let mut payments = self.payments.write().await;
        payments.insert(payment.id.0.clone(), payment);
        Ok(())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let payments = self.payments.read().await;
        let mut all: Vec<PaymentRecord> = payments.values().cloned().collect();
        all.sort_by(|left, right| right.recorded_at.cmp(&left.recorded_at));
        all.truncate(limit as usize);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use agora_core::domain::account::AccountId;
    use agora_core::domain::listing::{
        ApprovedListing, ListingId, ListingVisibility, ResourceType,
    };
    use agora_core::domain::payment::{PaymentId, PaymentRecord, PaymentStatus};
    use agora_core::domain::publisher::PublisherId;
    use agora_core::domain::submission::{
        ListingDetails, SubmissionDetails, SubmissionRequest, SubmissionStatus,
    };

    use crate::repositories::{
        InMemoryListingRepository, InMemoryPaymentRepository, InMemorySubmissionRepository,
        ListingRepository, PaymentRepository, SubmissionRepository,
    };

    fn request() -> SubmissionRequest {
        SubmissionRequest::create(
            PublisherId("pub-1".to_string()),
            SubmissionDetails::GeneralListing(ListingDetails {
                title: "Order Book Feed".to_string(),
                summary: "Order book snapshots".to_string(),
                resource_type: ResourceType::Api,
                tags: Vec::new(),
                price_usd: Decimal::new(9_900, 2),
            }),
            false,
        )
    }

    #[tokio::test]
    async fn in_memory_submission_repo_round_trip() {
        let repo = InMemorySubmissionRepository::default();
        let request = request();

        repo.save(request.clone()).await.expect("save");
        let found = repo.find_by_id(request.id()).await.expect("find");
        assert_eq!(found, Some(request.clone()));

        assert!(repo.delete(request.id()).await.expect("delete"));
        assert_eq!(repo.find_by_id(request.id()).await.expect("find again"), None);
    }

    #[tokio::test]
    async fn in_memory_submission_repo_filters_by_status() {
        let repo = InMemorySubmissionRepository::default();

        let submitted = request();
        repo.save(submitted).await.expect("save submitted");

        let mut rejected = request();
        rejected.reject("Missing docs").expect("reject");
        repo.save(rejected).await.expect("save rejected");

        let pending = repo
            .list_by_status(Some(SubmissionStatus::Submitted), 100)
            .await
            .expect("list pending");
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn in_memory_listing_repo_filters_published() {
        let repo = InMemoryListingRepository::default();
        let now = Utc::now();

        let published = ApprovedListing {
            id: ListingId("lst-1".to_string()),
            publisher_id: PublisherId("pub-1".to_string()),
            title: "Order Book Feed".to_string(),
            summary: "Order book snapshots".to_string(),
            resource_type: ResourceType::Api,
            tags: Vec::new(),
            price_usd: Decimal::new(9_900, 2),
            documentation: String::new(),
            reviews: Vec::new(),
            visibility: ListingVisibility::Published,
            published_at: now,
            updated_at: now,
        };
        let mut parked = published.clone();
        parked.id = ListingId("lst-2".to_string());
        parked.visibility = ListingVisibility::PendingReapproval;

        repo.save(published).await.expect("save published");
        repo.save(parked).await.expect("save parked");

        let visible = repo.list_published(None, Some("order book"), 100).await.expect("list");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id.0, "lst-1");
    }

    #[tokio::test]
    async fn in_memory_payment_repo_round_trip() {
        let repo = InMemoryPaymentRepository::default();
        let payment = PaymentRecord {
            id: PaymentId("pay-1".to_string()),
            account_id: AccountId("acc-1".to_string()),
            listing_id: ListingId("lst-1".to_string()),
            amount_usd: Decimal::new(9_900, 2),
            status: PaymentStatus::Settled,
            recorded_at: Utc::now(),
        };

        repo.save(payment.clone()).await.expect("save");
        assert_eq!(repo.list_all(100).await.expect("list"), vec![payment]);
    }
}
