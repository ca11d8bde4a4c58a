//! Submission workflow engine: applies lifecycle transitions to a request and
//! reports every applied or refused transition to the audit sink, plus the
//! user-facing confirmation copy to the notification sink.

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::publisher::PublisherId;
use crate::domain::submission::{SubmissionDetails, SubmissionRequest};
use crate::errors::DomainError;
use crate::notify::{submission_received_copy, Notice, NotificationSink};

pub struct SubmissionWorkflow<A, N> {
    audit: A,
    notify: N,
}

impl<A, N> SubmissionWorkflow<A, N>
where
    A: AuditSink,
    N: NotificationSink,
{
    pub fn new(audit: A, notify: N) -> Self {
        Self { audit, notify }
    }

    /// Create a new request in the `Submitted` state. Never fails: payload
    /// validation belongs to the submitting form, not the workflow.
    pub fn submit(
        &self,
        publisher_id: PublisherId,
        details: SubmissionDetails,
        is_reapproval: bool,
        audit: &AuditContext,
    ) -> SubmissionRequest {
        let request = SubmissionRequest::create(publisher_id, details, is_reapproval);

        self.audit.emit(
            AuditEvent::new(
                Some(request.id().clone()),
                audit.correlation_id.clone(),
                "workflow.submission_created",
                AuditCategory::Workflow,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("kind", format!("{:?}", request.kind()))
            .with_metadata("is_reapproval", is_reapproval.to_string()),
        );
        self.notify.push(Notice::success(
            submission_received_copy(is_reapproval),
            Some(request.id().clone()),
        ));

        request
    }

    pub fn begin_verification(
        &self,
        request: &mut SubmissionRequest,
        audit: &AuditContext,
    ) -> Result<(), DomainError> {
        self.transition(request, audit, "begin_verification", |request| {
            request.begin_verification()
        })
    }

    pub fn approve(
        &self,
        request: &mut SubmissionRequest,
        audit: &AuditContext,
    ) -> Result<(), DomainError> {
        let result = self.transition(request, audit, "approve", |request| request.approve());
        if result.is_ok() {
            self.notify.push(Notice::success(
                "Your submission was approved and is live in the catalog review queue.",
                Some(request.id().clone()),
            ));
        }
        result
    }

    pub fn reject(
        &self,
        request: &mut SubmissionRequest,
        reason: &str,
        audit: &AuditContext,
    ) -> Result<(), DomainError> {
        let result = self.transition(request, audit, "reject", |request| request.reject(reason));
        if result.is_ok() {
            self.notify.push(Notice::failure(
                format!("Your submission was rejected: {}", reason.trim()),
                Some(request.id().clone()),
            ));
        }
        result
    }

    /// Validate a withdrawal. Deleting the stored row is the caller's move;
    /// the engine only rules on legality and reports it.
    pub fn cancel(
        &self,
        request: &SubmissionRequest,
        audit: &AuditContext,
    ) -> Result<(), DomainError> {
        match request.ensure_cancellable() {
            Ok(()) => {
                self.emit_applied(request, audit, "cancel");
                self.notify
                    .push(Notice::success("Your submission was cancelled.", Some(request.id().clone())));
                Ok(())
            }
            Err(error) => {
                self.emit_refused(request, audit, "cancel", &error);
                Err(error)
            }
        }
    }

    /// Replace a rejected request with a fresh submission.
    pub fn resubmit(
        &self,
        request: &SubmissionRequest,
        details: SubmissionDetails,
        audit: &AuditContext,
    ) -> Result<SubmissionRequest, DomainError> {
        match request.resubmit(details) {
            Ok(replacement) => {
                self.audit.emit(
                    AuditEvent::new(
                        Some(replacement.id().clone()),
                        audit.correlation_id.clone(),
                        "workflow.transition_applied",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("action", "resubmit")
                    .with_metadata("supersedes", request.id().0.clone()),
                );
                self.notify.push(Notice::success(
                    submission_received_copy(replacement.is_reapproval()),
                    Some(replacement.id().clone()),
                ));
                Ok(replacement)
            }
            Err(error) => {
                self.emit_refused(request, audit, "resubmit", &error);
                Err(error)
            }
        }
    }

    fn transition(
        &self,
        request: &mut SubmissionRequest,
        audit: &AuditContext,
        action: &str,
        apply: impl FnOnce(&mut SubmissionRequest) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        let from = request.status();
        match apply(request) {
            Ok(()) => {
                self.audit.emit(
                    AuditEvent::new(
                        Some(request.id().clone()),
                        audit.correlation_id.clone(),
                        "workflow.transition_applied",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("action", action.to_owned())
                    .with_metadata("from", format!("{from:?}"))
                    .with_metadata("to", format!("{:?}", request.status()))
                    .with_metadata("step", request.step().to_string()),
                );
                Ok(())
            }
            Err(error) => {
                self.emit_refused(request, audit, action, &error);
                Err(error)
            }
        }
    }

    fn emit_applied(&self, request: &SubmissionRequest, audit: &AuditContext, action: &str) {
        self.audit.emit(
            AuditEvent::new(
                Some(request.id().clone()),
                audit.correlation_id.clone(),
                "workflow.transition_applied",
                AuditCategory::Workflow,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("action", action.to_owned())
            .with_metadata("from", format!("{:?}", request.status())),
        );
    }

    fn emit_refused(
        &self,
        request: &SubmissionRequest,
        audit: &AuditContext,
        action: &str,
        error: &DomainError,
    ) {
        self.audit.emit(
            AuditEvent::new(
                Some(request.id().clone()),
                audit.correlation_id.clone(),
                "workflow.transition_refused",
                AuditCategory::Workflow,
                audit.actor.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("action", action.to_owned())
            .with_metadata("error", error.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::domain::listing::ResourceType;
    use crate::domain::publisher::PublisherId;
    use crate::domain::submission::{
        ListingDetails, SubmissionDetails, SubmissionStatus,
    };
    use crate::notify::{InMemoryNotificationSink, NoticeLevel};

    use super::SubmissionWorkflow;

    fn workflow() -> SubmissionWorkflow<InMemoryAuditSink, InMemoryNotificationSink> {
        SubmissionWorkflow::new(InMemoryAuditSink::default(), InMemoryNotificationSink::default())
    }

    fn details(title: &str) -> SubmissionDetails {
        SubmissionDetails::GeneralListing(ListingDetails {
            title: title.to_string(),
            summary: "Weather model outputs".to_string(),
            resource_type: ResourceType::Dataset,
            tags: vec!["weather".to_string()],
            price_usd: Decimal::new(1_500, 2),
        })
    }

    fn ctx() -> AuditContext {
        AuditContext::new(None, "req-42", "review-desk")
    }

    #[test]
    fn submit_emits_audit_and_confirmation_copy() {
        let engine = workflow();
        let request = engine.submit(PublisherId("pub-1".to_string()), details("X"), false, &ctx());

        assert_eq!(request.status(), SubmissionStatus::Submitted);

        let events = engine.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "workflow.submission_created");
        assert_eq!(events[0].correlation_id, "req-42");

        let notices = engine.notify.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Your submission was received and is awaiting review.");
    }

    #[test]
    fn reapproval_submissions_get_their_own_copy() {
        let engine = workflow();
        engine.submit(PublisherId("pub-1".to_string()), details("X"), true, &ctx());

        let notices = engine.notify.notices();
        assert!(notices[0].message.contains("re-approval"));
    }

    #[test]
    fn approve_applies_and_audits_the_transition() {
        let engine = workflow();
        let mut request =
            engine.submit(PublisherId("pub-1".to_string()), details("X"), false, &ctx());

        engine.approve(&mut request, &ctx()).expect("approve");

        assert_eq!(request.status(), SubmissionStatus::Verified);
        let events = engine.audit.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, "workflow.transition_applied");
        assert_eq!(events[1].metadata.get("to").map(String::as_str), Some("Verified"));
        assert_eq!(events[1].metadata.get("step").map(String::as_str), Some("3"));
    }

    #[test]
    fn refused_cancel_is_audited_and_leaves_the_request_alone() {
        let engine = workflow();
        let mut request =
            engine.submit(PublisherId("pub-1".to_string()), details("X"), false, &ctx());
        engine.begin_verification(&mut request, &ctx()).expect("begin review");

        let error = engine.cancel(&request, &ctx()).expect_err("cancel past step 1");
        assert!(error.to_string().contains("invalid submission transition"));
        assert_eq!(request.status(), SubmissionStatus::Verifying);

        let events = engine.audit.events();
        let refused = events.last().expect("refusal event");
        assert_eq!(refused.event_type, "workflow.transition_refused");
        assert_eq!(refused.outcome, AuditOutcome::Rejected);
    }

    #[test]
    fn reject_pushes_a_failure_notice_with_the_reason() {
        let engine = workflow();
        let mut request =
            engine.submit(PublisherId("pub-1".to_string()), details("X"), false, &ctx());

        engine.reject(&mut request, "Missing docs", &ctx()).expect("reject");

        let notices = engine.notify.notices();
        let last = notices.last().expect("rejection notice");
        assert_eq!(last.level, NoticeLevel::Failure);
        assert!(last.message.contains("Missing docs"));
    }

    #[test]
    fn resubmit_audits_the_supersession() {
        let engine = workflow();
        let mut request =
            engine.submit(PublisherId("pub-1".to_string()), details("X"), false, &ctx());
        engine.reject(&mut request, "Missing docs", &ctx()).expect("reject");

        let replacement =
            engine.resubmit(&request, details("X v2"), &ctx()).expect("resubmit");

        assert_ne!(replacement.id(), request.id());
        let events = engine.audit.events();
        let last = events.last().expect("resubmit event");
        assert_eq!(last.metadata.get("action").map(String::as_str), Some("resubmit"));
        assert_eq!(last.metadata.get("supersedes"), Some(&request.id().0));
    }
}
