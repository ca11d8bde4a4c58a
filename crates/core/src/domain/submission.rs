use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::listing::{ListingId, ResourceType};
use crate::domain::publisher::PublisherId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    GeneralListing,
    HostedService,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    Verifying,
    Verified,
    Rejected,
}

impl SubmissionStatus {
    /// Progress indicator shown on the three-stage review bar. Derived,
    /// never stored: `status` is the single source of truth.
    pub fn step(self) -> u8 {
        match self {
            Self::Submitted => 1,
            Self::Verifying => 2,
            Self::Verified | Self::Rejected => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }
}

/// Transition being attempted, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionAction {
    BeginVerification,
    Approve,
    Reject,
    Cancel,
    Resubmit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub title: String,
    pub summary: String,
    pub resource_type: ResourceType,
    pub tags: Vec<String>,
    pub price_usd: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateCadence {
    Realtime,
    Daily,
    Weekly,
    Monthly,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingDetails {
    pub organization: String,
    pub dataset_name: String,
    pub capacity_gb: u32,
    pub update_cadence: UpdateCadence,
}

/// Payload attached at creation. The variant fixes the request kind for the
/// lifetime of the request; it never changes the state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionDetails {
    GeneralListing(ListingDetails),
    HostedService(HostingDetails),
}

impl SubmissionDetails {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::GeneralListing(_) => RequestKind::GeneralListing,
            Self::HostedService(_) => RequestKind::HostedService,
        }
    }
}

/// Timestamps of the transitions a request has gone through. A field is
/// present iff the corresponding transition occurred; each is stamped exactly
/// once and never cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDates {
    submitted: Option<DateTime<Utc>>,
    verifying: Option<DateTime<Utc>>,
    verified: Option<DateTime<Utc>>,
    rejected: Option<DateTime<Utc>>,
}

impl TransitionDates {
    pub fn submitted(&self) -> Option<DateTime<Utc>> {
        self.submitted
    }

    pub fn verifying(&self) -> Option<DateTime<Utc>> {
        self.verifying
    }

    pub fn verified(&self) -> Option<DateTime<Utc>> {
        self.verified
    }

    pub fn rejected(&self) -> Option<DateTime<Utc>> {
        self.rejected
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    Admin,
    User,
}

/// One entry in the rejection conversation thread. Append-only, insertion
/// ordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub sender: MessageSender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// A submission request moving through review:
/// `Submitted -> Verifying -> {Verified, Rejected}`.
///
/// Fields are private; the only way to change a request is through the
/// transition methods, so `status`, `step()` and the transition dates cannot
/// drift apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubmissionSnapshot", into = "SubmissionSnapshot")]
pub struct SubmissionRequest {
    id: SubmissionId,
    publisher_id: PublisherId,
    details: SubmissionDetails,
    status: SubmissionStatus,
    dates: TransitionDates,
    rejection_reason: Option<String>,
    messages: Vec<ThreadMessage>,
    is_reapproval: bool,
    target_listing_id: Option<ListingId>,
}

impl SubmissionRequest {
    pub fn create(
        publisher_id: PublisherId,
        details: SubmissionDetails,
        is_reapproval: bool,
    ) -> Self {
        Self {
            id: SubmissionId::generate(),
            publisher_id,
            details,
            status: SubmissionStatus::Submitted,
            dates: TransitionDates { submitted: Some(Utc::now()), ..TransitionDates::default() },
            rejection_reason: None,
            messages: Vec::new(),
            is_reapproval,
            target_listing_id: None,
        }
    }

    /// Link a re-approval request to the approved listing it re-reviews.
    pub fn with_target_listing(mut self, listing_id: ListingId) -> Self {
        self.target_listing_id = Some(listing_id);
        self
    }

    pub fn id(&self) -> &SubmissionId {
        &self.id
    }

    pub fn publisher_id(&self) -> &PublisherId {
        &self.publisher_id
    }

    pub fn kind(&self) -> RequestKind {
        self.details.kind()
    }

    pub fn details(&self) -> &SubmissionDetails {
        &self.details
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn step(&self) -> u8 {
        self.status.step()
    }

    pub fn dates(&self) -> &TransitionDates {
        &self.dates
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn messages(&self) -> &[ThreadMessage] {
        &self.messages
    }

    pub fn is_reapproval(&self) -> bool {
        self.is_reapproval
    }

    pub fn target_listing_id(&self) -> Option<&ListingId> {
        self.target_listing_id.as_ref()
    }

    /// Move a freshly submitted request into review.
    pub fn begin_verification(&mut self) -> Result<(), DomainError> {
        match self.status {
            SubmissionStatus::Submitted => {
                self.status = SubmissionStatus::Verifying;
                self.dates.verifying = Some(Utc::now());
                Ok(())
            }
            _ => Err(self.invalid(SubmissionAction::BeginVerification)),
        }
    }

    /// Approve the request. Legal from `Verifying`, and from `Submitted` as
    /// the one-click admin shorthand: the skipped `verifying` date is stamped
    /// at the same instant as `verified`.
    pub fn approve(&mut self) -> Result<(), DomainError> {
        match self.status {
            SubmissionStatus::Submitted | SubmissionStatus::Verifying => {
                let now = Utc::now();
                if self.dates.verifying.is_none() {
                    self.dates.verifying = Some(now);
                }
                self.status = SubmissionStatus::Verified;
                self.dates.verified = Some(now);
                Ok(())
            }
            _ => Err(self.invalid(SubmissionAction::Approve)),
        }
    }

    /// Reject the request with a reason. Same shorthand rule as [`approve`].
    ///
    /// [`approve`]: SubmissionRequest::approve
    pub fn reject(&mut self, reason: &str) -> Result<(), DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::EmptyRejectionReason);
        }

        match self.status {
            SubmissionStatus::Submitted | SubmissionStatus::Verifying => {
                let now = Utc::now();
                if self.dates.verifying.is_none() {
                    self.dates.verifying = Some(now);
                }
                self.status = SubmissionStatus::Rejected;
                self.dates.rejected = Some(now);
                self.rejection_reason = Some(reason.to_owned());
                Ok(())
            }
            _ => Err(self.invalid(SubmissionAction::Reject)),
        }
    }

    /// Check that the request may still be withdrawn by its publisher.
    /// Cancellation is only legal before review begins; the owning store
    /// deletes the request once this passes.
    pub fn ensure_cancellable(&self) -> Result<(), DomainError> {
        match self.status {
            SubmissionStatus::Submitted => Ok(()),
            _ => Err(self.invalid(SubmissionAction::Cancel)),
        }
    }

    /// Produce a replacement request for a rejected one. The original is left
    /// untouched and superseded; the conversation thread does not carry over.
    pub fn resubmit(&self, details: SubmissionDetails) -> Result<SubmissionRequest, DomainError> {
        if self.status != SubmissionStatus::Rejected {
            return Err(self.invalid(SubmissionAction::Resubmit));
        }

        let mut replacement =
            SubmissionRequest::create(self.publisher_id.clone(), details, self.is_reapproval);
        replacement.target_listing_id = self.target_listing_id.clone();
        Ok(replacement)
    }

    /// Append to the rejection conversation thread.
    pub fn push_message(&mut self, sender: MessageSender, text: impl Into<String>) {
        self.messages.push(ThreadMessage { sender, text: text.into(), sent_at: Utc::now() });
    }

    fn invalid(&self, action: SubmissionAction) -> DomainError {
        DomainError::InvalidSubmissionTransition { from: self.status, action }
    }
}

/// Flat record used to persist and restore a request. Restoring goes through
/// [`SubmissionRequest::try_from`], which re-checks the aggregate invariants
/// so a hand-edited or corrupted row cannot produce an impossible state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionSnapshot {
    pub id: String,
    pub publisher_id: String,
    pub details: SubmissionDetails,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub verifying_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub messages: Vec<ThreadMessage>,
    pub is_reapproval: bool,
    pub target_listing_id: Option<String>,
}

impl From<SubmissionRequest> for SubmissionSnapshot {
    fn from(request: SubmissionRequest) -> Self {
        Self {
            id: request.id.0,
            publisher_id: request.publisher_id.0,
            details: request.details,
            status: request.status,
            submitted_at: request.dates.submitted.unwrap_or(DateTime::<Utc>::MIN_UTC),
            verifying_at: request.dates.verifying,
            verified_at: request.dates.verified,
            rejected_at: request.dates.rejected,
            rejection_reason: request.rejection_reason,
            messages: request.messages,
            is_reapproval: request.is_reapproval,
            target_listing_id: request.target_listing_id.map(|id| id.0),
        }
    }
}

impl TryFrom<SubmissionSnapshot> for SubmissionRequest {
    type Error = DomainError;

    fn try_from(snapshot: SubmissionSnapshot) -> Result<Self, Self::Error> {
        let invariant = |message: &str| DomainError::InvariantViolation(message.to_owned());

        match snapshot.status {
            SubmissionStatus::Submitted => {
                if snapshot.verifying_at.is_some()
                    || snapshot.verified_at.is_some()
                    || snapshot.rejected_at.is_some()
                {
                    return Err(invariant("submitted request carries later transition dates"));
                }
            }
            SubmissionStatus::Verifying => {
                if snapshot.verifying_at.is_none() {
                    return Err(invariant("verifying request is missing its verifying date"));
                }
                if snapshot.verified_at.is_some() || snapshot.rejected_at.is_some() {
                    return Err(invariant("verifying request carries a terminal date"));
                }
            }
            SubmissionStatus::Verified => {
                if snapshot.verifying_at.is_none() || snapshot.verified_at.is_none() {
                    return Err(invariant("verified request is missing a transition date"));
                }
                if snapshot.rejected_at.is_some() {
                    return Err(invariant("verified request carries a rejected date"));
                }
            }
            SubmissionStatus::Rejected => {
                if snapshot.verifying_at.is_none() || snapshot.rejected_at.is_none() {
                    return Err(invariant("rejected request is missing a transition date"));
                }
                if snapshot.verified_at.is_some() {
                    return Err(invariant("rejected request carries a verified date"));
                }
            }
        }

        if snapshot.rejection_reason.is_some() != (snapshot.status == SubmissionStatus::Rejected) {
            return Err(invariant("rejection reason present iff status is rejected"));
        }

        Ok(Self {
            id: SubmissionId(snapshot.id),
            publisher_id: PublisherId(snapshot.publisher_id),
            details: snapshot.details,
            status: snapshot.status,
            dates: TransitionDates {
                submitted: Some(snapshot.submitted_at),
                verifying: snapshot.verifying_at,
                verified: snapshot.verified_at,
                rejected: snapshot.rejected_at,
            },
            rejection_reason: snapshot.rejection_reason,
            messages: snapshot.messages,
            is_reapproval: snapshot.is_reapproval,
            target_listing_id: snapshot.target_listing_id.map(ListingId),
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::listing::{ListingId, ResourceType};
    use crate::domain::publisher::PublisherId;
    use crate::errors::DomainError;

    use super::{
        HostingDetails, ListingDetails, MessageSender, RequestKind, SubmissionAction,
        SubmissionDetails, SubmissionRequest, SubmissionSnapshot, SubmissionStatus, UpdateCadence,
    };

    fn listing_details(title: &str) -> SubmissionDetails {
        SubmissionDetails::GeneralListing(ListingDetails {
            title: title.to_string(),
            summary: "Streaming market data".to_string(),
            resource_type: ResourceType::Api,
            tags: vec!["finance".to_string()],
            price_usd: Decimal::new(4_900, 2),
        })
    }

    fn hosting_details() -> SubmissionDetails {
        SubmissionDetails::HostedService(HostingDetails {
            organization: "Acme Data".to_string(),
            dataset_name: "acme-tickers".to_string(),
            capacity_gb: 250,
            update_cadence: UpdateCadence::Daily,
        })
    }

    fn submitted(title: &str) -> SubmissionRequest {
        SubmissionRequest::create(PublisherId("pub-1".to_string()), listing_details(title), false)
    }

    #[test]
    fn create_starts_submitted_with_only_the_submitted_date() {
        let request = submitted("X");

        assert_eq!(request.status(), SubmissionStatus::Submitted);
        assert_eq!(request.step(), 1);
        assert_eq!(request.kind(), RequestKind::GeneralListing);
        assert!(request.dates().submitted().is_some());
        assert!(request.dates().verifying().is_none());
        assert!(request.dates().verified().is_none());
        assert!(request.dates().rejected().is_none());
        assert!(request.rejection_reason().is_none());
        assert!(!request.is_reapproval());
    }

    #[test]
    fn begin_verification_moves_to_step_two() {
        let mut request = submitted("X");
        request.begin_verification().expect("submitted -> verifying");

        assert_eq!(request.status(), SubmissionStatus::Verifying);
        assert_eq!(request.step(), 2);
        assert!(request.dates().verifying().is_some());
    }

    #[test]
    fn one_click_approve_stamps_both_dates_at_the_same_instant() {
        let mut request = submitted("X");
        request.approve().expect("submitted -> verified shorthand");

        assert_eq!(request.status(), SubmissionStatus::Verified);
        assert_eq!(request.step(), 3);
        assert_eq!(request.dates().verifying(), request.dates().verified());
    }

    #[test]
    fn approve_after_explicit_review_keeps_the_earlier_verifying_date() {
        let mut request = submitted("X");
        request.begin_verification().expect("submitted -> verifying");
        let verifying_at = request.dates().verifying();

        request.approve().expect("verifying -> verified");
        assert_eq!(request.dates().verifying(), verifying_at);
        assert!(request.dates().verified() >= verifying_at);
    }

    #[test]
    fn one_click_reject_records_the_reason() {
        let mut request = submitted("X");
        request.reject("Missing docs").expect("submitted -> rejected shorthand");

        assert_eq!(request.status(), SubmissionStatus::Rejected);
        assert_eq!(request.step(), 3);
        assert_eq!(request.rejection_reason(), Some("Missing docs"));
        assert!(request.dates().rejected().is_some());
        assert!(request.dates().verified().is_none());
    }

    #[test]
    fn reject_requires_a_non_empty_reason() {
        let mut request = submitted("X");
        let error = request.reject("   ").expect_err("blank reason must be refused");

        assert_eq!(error, DomainError::EmptyRejectionReason);
        assert_eq!(request.status(), SubmissionStatus::Submitted);
        assert!(request.rejection_reason().is_none());
    }

    #[test]
    fn cancel_is_refused_once_review_has_begun() {
        let mut request = submitted("X");
        request.begin_verification().expect("submitted -> verifying");

        let error = request.ensure_cancellable().expect_err("verifying cannot be cancelled");
        assert_eq!(
            error,
            DomainError::InvalidSubmissionTransition {
                from: SubmissionStatus::Verifying,
                action: SubmissionAction::Cancel,
            }
        );
        assert_eq!(request.status(), SubmissionStatus::Verifying);
    }

    #[test]
    fn cancel_is_legal_while_submitted() {
        let request = submitted("X");
        request.ensure_cancellable().expect("submitted requests can be withdrawn");
    }

    #[test]
    fn terminal_requests_refuse_further_transitions() {
        let mut request = submitted("X");
        request.approve().expect("approve");

        assert!(request.begin_verification().is_err());
        assert!(request.approve().is_err());
        assert!(request.reject("too late").is_err());
        assert!(request.ensure_cancellable().is_err());
    }

    #[test]
    fn resubmit_creates_a_fresh_request_and_leaves_the_original_alone() {
        let mut request = submitted("X");
        request.reject("Missing docs").expect("reject");
        request.push_message(MessageSender::Admin, "Please add API docs.");

        let replacement = request.resubmit(listing_details("X v2")).expect("rejected -> resubmit");

        assert_ne!(replacement.id(), request.id());
        assert_eq!(replacement.status(), SubmissionStatus::Submitted);
        assert_eq!(replacement.step(), 1);
        assert!(replacement.messages().is_empty());
        assert_eq!(request.status(), SubmissionStatus::Rejected);
        assert_eq!(request.messages().len(), 1);
    }

    #[test]
    fn resubmit_is_only_legal_from_rejected() {
        let request = submitted("X");
        let error = request.resubmit(listing_details("X v2")).expect_err("submitted cannot resubmit");

        assert_eq!(
            error,
            DomainError::InvalidSubmissionTransition {
                from: SubmissionStatus::Submitted,
                action: SubmissionAction::Resubmit,
            }
        );
    }

    #[test]
    fn resubmission_of_a_reapproval_keeps_the_listing_link() {
        let mut request = SubmissionRequest::create(
            PublisherId("pub-1".to_string()),
            listing_details("X"),
            true,
        )
        .with_target_listing(ListingId("lst-1".to_string()));
        request.reject("Summary too vague").expect("reject");

        let replacement = request.resubmit(listing_details("X v2")).expect("resubmit");
        assert!(replacement.is_reapproval());
        assert_eq!(replacement.target_listing_id(), Some(&ListingId("lst-1".to_string())));
    }

    #[test]
    fn step_is_fully_determined_by_status() {
        assert_eq!(SubmissionStatus::Submitted.step(), 1);
        assert_eq!(SubmissionStatus::Verifying.step(), 2);
        assert_eq!(SubmissionStatus::Verified.step(), 3);
        assert_eq!(SubmissionStatus::Rejected.step(), 3);
    }

    #[test]
    fn exactly_one_terminal_date_once_terminal() {
        let mut approved = submitted("A");
        approved.approve().expect("approve");
        assert!(approved.dates().verified().is_some() && approved.dates().rejected().is_none());

        let mut rejected = submitted("B");
        rejected.reject("No docs").expect("reject");
        assert!(rejected.dates().rejected().is_some() && rejected.dates().verified().is_none());
    }

    #[test]
    fn hosting_requests_share_the_machine_but_report_their_own_kind() {
        let mut request = SubmissionRequest::create(
            PublisherId("pub-2".to_string()),
            hosting_details(),
            false,
        );
        assert_eq!(request.kind(), RequestKind::HostedService);

        request.approve().expect("hosting requests approve the same way");
        assert_eq!(request.status(), SubmissionStatus::Verified);
    }

    #[test]
    fn snapshot_round_trips_through_serde() {
        let mut request = submitted("X");
        request.reject("Missing docs").expect("reject");
        request.push_message(MessageSender::User, "Docs added, please re-check.");

        let encoded = serde_json::to_string(&request).expect("serialize");
        let decoded: SubmissionRequest = serde_json::from_str(&encoded).expect("deserialize");

        assert_eq!(decoded, request);
    }

    #[test]
    fn restore_refuses_a_snapshot_with_drifted_dates() {
        let request = submitted("X");
        let mut snapshot = SubmissionSnapshot::from(request);
        snapshot.verified_at = Some(snapshot.submitted_at);

        let error = SubmissionRequest::try_from(snapshot).expect_err("drifted snapshot");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn restore_refuses_a_reason_without_a_rejection() {
        let request = submitted("X");
        let mut snapshot = SubmissionSnapshot::from(request);
        snapshot.rejection_reason = Some("orphaned reason".to_string());

        let error = SubmissionRequest::try_from(snapshot).expect_err("orphaned reason");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }
}
