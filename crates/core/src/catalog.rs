//! Catalog-side rules for approved listings: which edits save directly,
//! which re-enter the review workflow, and how a decided re-approval request
//! resolves back onto its listing.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::hosted_service::{HostedService, HostedServiceId};
use crate::domain::listing::{ApprovedListing, ListingId, ListingVisibility, Review};
use crate::domain::submission::{
    ListingDetails, SubmissionDetails, SubmissionRequest, SubmissionStatus,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSection {
    BasicInfo,
    Documentation,
    Pricing,
    Reviews,
}

/// One section edit against an approved listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum ListingEdit {
    BasicInfo(ListingDetails),
    Documentation { body: String },
    Pricing { price_usd: Decimal },
    Review(Review),
}

impl ListingEdit {
    pub fn section(&self) -> ListingSection {
        match self {
            Self::BasicInfo(_) => ListingSection::BasicInfo,
            Self::Documentation { .. } => ListingSection::Documentation,
            Self::Pricing { .. } => ListingSection::Pricing,
            Self::Review(_) => ListingSection::Reviews,
        }
    }
}

/// Whether the caller acknowledged the re-approval warning before editing
/// basic information. Non-basic edits ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReapprovalAck {
    Confirmed,
    NotConfirmed,
}

/// Outcome of planning an edit. `SaveDirect` carries the updated listing;
/// `EnterReapproval` carries the parked listing plus the freshly created
/// review request. The caller persists both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditPlan {
    SaveDirect(ApprovedListing),
    EnterReapproval { listing: ApprovedListing, request: SubmissionRequest },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("modifying basic information of an approved listing requires re-approval confirmation")]
    ConfirmationRequired,
    #[error("listing `{listing_id}` is already awaiting re-approval")]
    ReapprovalInProgress { listing_id: String },
    #[error("request `{request_id}` does not target listing `{listing_id}`")]
    RequestListingMismatch { request_id: String, listing_id: String },
    #[error("request `{request_id}` has not reached a decision")]
    RequestNotDecided { request_id: String },
    #[error("request `{request_id}` does not carry the expected details")]
    DetailsMismatch { request_id: String },
}

/// Decide what an edit does. Basic information re-enters review behind the
/// confirmation gate; documentation, pricing and reviews save directly.
pub fn plan_edit(
    listing: &ApprovedListing,
    edit: ListingEdit,
    ack: ReapprovalAck,
) -> Result<EditPlan, CatalogError> {
    match edit {
        ListingEdit::BasicInfo(details) => {
            if listing.visibility == ListingVisibility::PendingReapproval {
                return Err(CatalogError::ReapprovalInProgress {
                    listing_id: listing.id.0.clone(),
                });
            }
            if ack != ReapprovalAck::Confirmed {
                return Err(CatalogError::ConfirmationRequired);
            }

            let request = SubmissionRequest::create(
                listing.publisher_id.clone(),
                SubmissionDetails::GeneralListing(details),
                true,
            )
            .with_target_listing(listing.id.clone());

            let mut parked = listing.clone();
            parked.visibility = ListingVisibility::PendingReapproval;
            parked.updated_at = Utc::now();

            Ok(EditPlan::EnterReapproval { listing: parked, request })
        }
        ListingEdit::Documentation { body } => Ok(EditPlan::SaveDirect(touched(listing, |l| {
            l.documentation = body;
        }))),
        ListingEdit::Pricing { price_usd } => Ok(EditPlan::SaveDirect(touched(listing, |l| {
            l.price_usd = price_usd;
        }))),
        ListingEdit::Review(review) => Ok(EditPlan::SaveDirect(touched(listing, |l| {
            l.reviews.push(review);
        }))),
    }
}

/// Fold a decided re-approval request back onto its listing: a verified
/// request applies the new basic information, a rejected one restores the
/// previous details. Either way the listing returns to the catalog.
pub fn resolve_reapproval(
    listing: &ApprovedListing,
    request: &SubmissionRequest,
) -> Result<ApprovedListing, CatalogError> {
    if request.target_listing_id() != Some(&listing.id) {
        return Err(CatalogError::RequestListingMismatch {
            request_id: request.id().0.clone(),
            listing_id: listing.id.0.clone(),
        });
    }

    match request.status() {
        SubmissionStatus::Verified => {
            let SubmissionDetails::GeneralListing(details) = request.details() else {
                return Err(CatalogError::DetailsMismatch { request_id: request.id().0.clone() });
            };
            Ok(touched(listing, |l| {
                l.title = details.title.clone();
                l.summary = details.summary.clone();
                l.resource_type = details.resource_type;
                l.tags = details.tags.clone();
                l.price_usd = details.price_usd;
                l.visibility = ListingVisibility::Published;
            }))
        }
        SubmissionStatus::Rejected => Ok(touched(listing, |l| {
            l.visibility = ListingVisibility::Published;
        })),
        _ => Err(CatalogError::RequestNotDecided { request_id: request.id().0.clone() }),
    }
}

/// Create a catalog listing from a verified first-time general submission.
pub fn publish_listing(request: &SubmissionRequest) -> Result<ApprovedListing, CatalogError> {
    if request.status() != SubmissionStatus::Verified {
        return Err(CatalogError::RequestNotDecided { request_id: request.id().0.clone() });
    }
    let SubmissionDetails::GeneralListing(details) = request.details() else {
        return Err(CatalogError::DetailsMismatch { request_id: request.id().0.clone() });
    };

    let now = Utc::now();
    Ok(ApprovedListing {
        id: ListingId(Uuid::new_v4().to_string()),
        publisher_id: request.publisher_id().clone(),
        title: details.title.clone(),
        summary: details.summary.clone(),
        resource_type: details.resource_type,
        tags: details.tags.clone(),
        price_usd: details.price_usd,
        documentation: String::new(),
        reviews: Vec::new(),
        visibility: ListingVisibility::Published,
        published_at: now,
        updated_at: now,
    })
}

/// Activate hosted infrastructure from a verified hosting request.
pub fn activate_hosted_service(
    request: &SubmissionRequest,
) -> Result<HostedService, CatalogError> {
    if request.status() != SubmissionStatus::Verified {
        return Err(CatalogError::RequestNotDecided { request_id: request.id().0.clone() });
    }
    let SubmissionDetails::HostedService(details) = request.details() else {
        return Err(CatalogError::DetailsMismatch { request_id: request.id().0.clone() });
    };

    Ok(HostedService {
        id: HostedServiceId(Uuid::new_v4().to_string()),
        publisher_id: request.publisher_id().clone(),
        organization: details.organization.clone(),
        dataset_name: details.dataset_name.clone(),
        capacity_gb: details.capacity_gb,
        update_cadence: details.update_cadence,
        active: true,
        activated_at: Utc::now(),
    })
}

fn touched(listing: &ApprovedListing, apply: impl FnOnce(&mut ApprovedListing)) -> ApprovedListing {
    let mut updated = listing.clone();
    apply(&mut updated);
    updated.updated_at = Utc::now();
    updated
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::listing::{
        ApprovedListing, ListingId, ListingVisibility, ResourceType, Review,
    };
    use crate::domain::publisher::PublisherId;
    use crate::domain::submission::{
        HostingDetails, ListingDetails, SubmissionDetails, SubmissionRequest, SubmissionStatus,
        UpdateCadence,
    };

    use super::{
        activate_hosted_service, plan_edit, publish_listing, resolve_reapproval, CatalogError,
        EditPlan, ListingEdit, ReapprovalAck,
    };

    fn details(title: &str) -> ListingDetails {
        ListingDetails {
            title: title.to_string(),
            summary: "Order book snapshots".to_string(),
            resource_type: ResourceType::Api,
            tags: vec!["finance".to_string(), "streaming".to_string()],
            price_usd: Decimal::new(9_900, 2),
        }
    }

    fn listing() -> ApprovedListing {
        let now = Utc::now();
        ApprovedListing {
            id: ListingId("lst-1".to_string()),
            publisher_id: PublisherId("pub-1".to_string()),
            title: "Order Book Feed".to_string(),
            summary: "Order book snapshots".to_string(),
            resource_type: ResourceType::Api,
            tags: vec!["finance".to_string()],
            price_usd: Decimal::new(9_900, 2),
            documentation: "## Getting started".to_string(),
            reviews: Vec::new(),
            visibility: ListingVisibility::Published,
            published_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn edits_report_the_section_they_touch() {
        use super::ListingSection;

        assert_eq!(ListingEdit::BasicInfo(details("X")).section(), ListingSection::BasicInfo);
        assert_eq!(
            ListingEdit::Documentation { body: String::new() }.section(),
            ListingSection::Documentation
        );
        assert_eq!(
            ListingEdit::Pricing { price_usd: Decimal::ZERO }.section(),
            ListingSection::Pricing
        );
    }

    #[test]
    fn basic_info_edit_without_confirmation_is_refused() {
        let error = plan_edit(
            &listing(),
            ListingEdit::BasicInfo(details("Order Book Feed v2")),
            ReapprovalAck::NotConfirmed,
        )
        .expect_err("gate must hold without acknowledgment");

        assert_eq!(error, CatalogError::ConfirmationRequired);
    }

    #[test]
    fn confirmed_basic_info_edit_parks_the_listing_and_opens_a_request() {
        let plan = plan_edit(
            &listing(),
            ListingEdit::BasicInfo(details("Order Book Feed v2")),
            ReapprovalAck::Confirmed,
        )
        .expect("confirmed edit");

        let EditPlan::EnterReapproval { listing: parked, request } = plan else {
            panic!("basic info edit must re-enter review");
        };
        assert_eq!(parked.visibility, ListingVisibility::PendingReapproval);
        assert!(request.is_reapproval());
        assert_eq!(request.status(), SubmissionStatus::Submitted);
        assert_eq!(request.target_listing_id(), Some(&parked.id));
    }

    #[test]
    fn second_basic_info_edit_waits_for_the_open_request() {
        let mut parked = listing();
        parked.visibility = ListingVisibility::PendingReapproval;

        let error = plan_edit(
            &parked,
            ListingEdit::BasicInfo(details("Order Book Feed v3")),
            ReapprovalAck::Confirmed,
        )
        .expect_err("a parked listing cannot re-enter review again");

        assert!(matches!(error, CatalogError::ReapprovalInProgress { .. }));
    }

    #[test]
    fn documentation_edit_saves_directly_without_a_request() {
        let plan = plan_edit(
            &listing(),
            ListingEdit::Documentation { body: "## New docs".to_string() },
            ReapprovalAck::NotConfirmed,
        )
        .expect("documentation edits bypass the gate");

        let EditPlan::SaveDirect(updated) = plan else {
            panic!("documentation edit must save directly");
        };
        assert_eq!(updated.documentation, "## New docs");
        assert_eq!(updated.visibility, ListingVisibility::Published);
    }

    #[test]
    fn pricing_and_review_edits_save_directly() {
        let priced = plan_edit(
            &listing(),
            ListingEdit::Pricing { price_usd: Decimal::new(12_900, 2) },
            ReapprovalAck::NotConfirmed,
        )
        .expect("pricing edit");
        assert!(matches!(priced, EditPlan::SaveDirect(ref l) if l.price_usd == Decimal::new(12_900, 2)));

        let reviewed = plan_edit(
            &listing(),
            ListingEdit::Review(Review {
                author: "dana".to_string(),
                rating: 5,
                body: "Solid latency.".to_string(),
                posted_at: Utc::now(),
            }),
            ReapprovalAck::NotConfirmed,
        )
        .expect("review edit");
        assert!(matches!(reviewed, EditPlan::SaveDirect(ref l) if l.reviews.len() == 1));
    }

    #[test]
    fn verified_reapproval_applies_new_details_and_republishes() {
        let plan = plan_edit(
            &listing(),
            ListingEdit::BasicInfo(details("Order Book Feed v2")),
            ReapprovalAck::Confirmed,
        )
        .expect("confirmed edit");
        let EditPlan::EnterReapproval { listing: parked, mut request } = plan else {
            panic!("expected re-approval plan");
        };

        request.approve().expect("approve re-approval request");
        let resolved = resolve_reapproval(&parked, &request).expect("resolve");

        assert_eq!(resolved.title, "Order Book Feed v2");
        assert_eq!(resolved.visibility, ListingVisibility::Published);
    }

    #[test]
    fn rejected_reapproval_restores_the_previous_details() {
        let plan = plan_edit(
            &listing(),
            ListingEdit::BasicInfo(details("Order Book Feed v2")),
            ReapprovalAck::Confirmed,
        )
        .expect("confirmed edit");
        let EditPlan::EnterReapproval { listing: parked, mut request } = plan else {
            panic!("expected re-approval plan");
        };

        request.reject("Title is misleading").expect("reject re-approval request");
        let resolved = resolve_reapproval(&parked, &request).expect("resolve");

        assert_eq!(resolved.title, "Order Book Feed");
        assert_eq!(resolved.visibility, ListingVisibility::Published);
    }

    #[test]
    fn undecided_reapproval_cannot_resolve() {
        let plan = plan_edit(
            &listing(),
            ListingEdit::BasicInfo(details("Order Book Feed v2")),
            ReapprovalAck::Confirmed,
        )
        .expect("confirmed edit");
        let EditPlan::EnterReapproval { listing: parked, request } = plan else {
            panic!("expected re-approval plan");
        };

        let error = resolve_reapproval(&parked, &request).expect_err("still in review");
        assert!(matches!(error, CatalogError::RequestNotDecided { .. }));
    }

    #[test]
    fn resolving_against_the_wrong_listing_is_refused() {
        let plan = plan_edit(
            &listing(),
            ListingEdit::BasicInfo(details("Order Book Feed v2")),
            ReapprovalAck::Confirmed,
        )
        .expect("confirmed edit");
        let EditPlan::EnterReapproval { mut request, .. } = plan else {
            panic!("expected re-approval plan");
        };
        request.approve().expect("approve");

        let mut other = listing();
        other.id = ListingId("lst-2".to_string());

        let error = resolve_reapproval(&other, &request).expect_err("wrong listing");
        assert!(matches!(error, CatalogError::RequestListingMismatch { .. }));
    }

    #[test]
    fn verified_general_submission_publishes_a_listing() {
        let mut request = SubmissionRequest::create(
            PublisherId("pub-1".to_string()),
            SubmissionDetails::GeneralListing(details("Order Book Feed")),
            false,
        );
        request.approve().expect("approve");

        let published = publish_listing(&request).expect("publish");
        assert_eq!(published.title, "Order Book Feed");
        assert_eq!(published.visibility, ListingVisibility::Published);
        assert_eq!(&published.publisher_id, request.publisher_id());
    }

    #[test]
    fn unverified_submission_cannot_publish() {
        let request = SubmissionRequest::create(
            PublisherId("pub-1".to_string()),
            SubmissionDetails::GeneralListing(details("Order Book Feed")),
            false,
        );

        let error = publish_listing(&request).expect_err("not yet verified");
        assert!(matches!(error, CatalogError::RequestNotDecided { .. }));
    }

    #[test]
    fn verified_hosting_request_activates_a_service() {
        let mut request = SubmissionRequest::create(
            PublisherId("pub-2".to_string()),
            SubmissionDetails::HostedService(HostingDetails {
                organization: "Acme Data".to_string(),
                dataset_name: "acme-tickers".to_string(),
                capacity_gb: 250,
                update_cadence: UpdateCadence::Daily,
            }),
            false,
        );
        request.approve().expect("approve");

        let service = activate_hosted_service(&request).expect("activate");
        assert!(service.active);
        assert_eq!(service.dataset_name, "acme-tickers");
    }

    #[test]
    fn listing_request_cannot_activate_hosting() {
        let mut request = SubmissionRequest::create(
            PublisherId("pub-1".to_string()),
            SubmissionDetails::GeneralListing(details("Order Book Feed")),
            false,
        );
        request.approve().expect("approve");

        let error = activate_hosted_service(&request).expect_err("details mismatch");
        assert!(matches!(error, CatalogError::DetailsMismatch { .. }));
    }
}
