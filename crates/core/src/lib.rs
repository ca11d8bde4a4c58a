pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod workflow;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
pub use catalog::{
    activate_hosted_service, plan_edit, publish_listing, resolve_reapproval, CatalogError,
    EditPlan, ListingEdit, ListingSection, ReapprovalAck,
};
pub use domain::account::{Account, AccountId, AccountRole};
pub use domain::hosted_service::{HostedService, HostedServiceId};
pub use domain::listing::{ApprovedListing, ListingId, ListingVisibility, ResourceType, Review};
pub use domain::payment::{PaymentId, PaymentRecord, PaymentStatus};
pub use domain::publisher::{Publisher, PublisherId};
pub use domain::submission::{
    HostingDetails, ListingDetails, MessageSender, RequestKind, SubmissionDetails, SubmissionId,
    SubmissionRequest, SubmissionSnapshot, SubmissionStatus, ThreadMessage, UpdateCadence,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use notify::{
    submission_received_copy, InMemoryNotificationSink, Notice, NoticeLevel, NotificationSink,
};
pub use workflow::SubmissionWorkflow;
