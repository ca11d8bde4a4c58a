//! Marketplace JSON API.
//!
//! Catalog:
//! - `GET  /api/v1/catalog`                          — published listings
//! - `GET  /api/v1/catalog/{id}`                     — one listing
//!
//! Submissions:
//! - `POST /api/v1/submissions`                      — create a request
//! - `GET  /api/v1/submissions/{id}`                 — request detail
//! - `POST /api/v1/submissions/{id}/cancel`          — withdraw before review
//! - `POST /api/v1/submissions/{id}/resubmit`        — replace a rejected request
//! - `POST /api/v1/submissions/{id}/messages`        — append to the thread
//! - `POST /api/v1/listings/{id}/edit`               — section edit (re-approval gate)
//!
//! Back-office:
//! - `GET  /api/v1/admin/submissions`                — review queue
//! - `POST /api/v1/admin/submissions/{id}/verify`    — begin review
//! - `POST /api/v1/admin/submissions/{id}/approve`   — one-click approve
//! - `POST /api/v1/admin/submissions/{id}/reject`    — one-click reject
//! - `GET  /api/v1/admin/accounts`                   — member/admin accounts
//! - `GET  /api/v1/admin/payments`                   — purchase records
//! - `GET  /api/v1/admin/hosted-services`            — hosted infrastructure
//! - `POST /api/v1/admin/hosted-services/{id}/suspend`
//! - `POST /api/v1/admin/hosted-services/{id}/resume`

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use agora_core::audit::{AuditContext, TracingAuditSink};
use agora_core::catalog::{self, CatalogError, EditPlan, ListingEdit, ReapprovalAck};
use agora_core::domain::account::Account;
use agora_core::domain::hosted_service::{HostedService, HostedServiceId};
use agora_core::domain::listing::{ApprovedListing, ListingId, ResourceType};
use agora_core::domain::payment::PaymentRecord;
use agora_core::domain::publisher::PublisherId;
use agora_core::domain::submission::{
    MessageSender, RequestKind, SubmissionDetails, SubmissionId, SubmissionRequest,
    SubmissionStatus, ThreadMessage,
};
use agora_core::errors::DomainError;
use agora_core::notify::{submission_received_copy, InMemoryNotificationSink};
use agora_core::workflow::SubmissionWorkflow;
use agora_db::repositories::{
    AccountRepository, HostedServiceRepository, ListingRepository, PaymentRepository,
    RepositoryError, SqlAccountRepository, SqlHostedServiceRepository, SqlListingRepository,
    SqlPaymentRepository, SqlSubmissionRepository, SubmissionRepository,
};
use agora_db::DbPool;

const LIST_LIMIT: u32 = 100;

const PUBLISHER_ACTOR: &str = "publisher-portal";
const ADMIN_ACTOR: &str = "review-desk";

#[derive(Clone)]
pub struct ApiState {
    db_pool: DbPool,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/api/v1/catalog", get(list_catalog))
        .route("/api/v1/catalog/{id}", get(get_listing))
        .route("/api/v1/submissions", post(create_submission))
        .route("/api/v1/submissions/{id}", get(get_submission))
        .route("/api/v1/submissions/{id}/cancel", post(cancel_submission))
        .route("/api/v1/submissions/{id}/resubmit", post(resubmit_submission))
        .route("/api/v1/submissions/{id}/messages", post(add_message))
        .route("/api/v1/listings/{id}/edit", post(edit_listing))
        .route("/api/v1/admin/submissions", get(list_submissions))
        .route("/api/v1/admin/submissions/{id}/verify", post(begin_verification))
        .route("/api/v1/admin/submissions/{id}/approve", post(approve_submission))
        .route("/api/v1/admin/submissions/{id}/reject", post(reject_submission))
        .route("/api/v1/admin/accounts", get(list_accounts))
        .route("/api/v1/admin/payments", get(list_payments))
        .route("/api/v1/admin/hosted-services", get(list_hosted_services))
        .route("/api/v1/admin/hosted-services/{id}/suspend", post(suspend_hosted_service))
        .route("/api/v1/admin/hosted-services/{id}/resume", post(resume_hosted_service))
        .with_state(ApiState { db_pool })
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
pub struct CreateSubmissionBody {
    pub publisher_id: String,
    pub details: SubmissionDetails,
    #[serde(default)]
    pub is_reapproval: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResubmitBody {
    pub details: SubmissionDetails,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub sender: MessageSender,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EditListingBody {
    pub edit: ListingEdit,
    #[serde(default)]
    pub ack: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct CatalogQuery {
    pub resource_type: Option<ResourceType>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReviewQueueQuery {
    pub status: Option<SubmissionStatus>,
}

#[derive(Debug, Serialize)]
pub struct DatesView {
    pub submitted: Option<DateTime<Utc>>,
    pub verifying: Option<DateTime<Utc>>,
    pub verified: Option<DateTime<Utc>>,
    pub rejected: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionView {
    pub id: String,
    pub publisher_id: String,
    pub kind: RequestKind,
    pub status: SubmissionStatus,
    pub step: u8,
    pub details: SubmissionDetails,
    pub dates: DatesView,
    pub rejection_reason: Option<String>,
    pub messages: Vec<ThreadMessage>,
    pub is_reapproval: bool,
    pub target_listing_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub listing: ApprovedListing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<SubmissionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

fn submission_view(request: &SubmissionRequest, notice: Option<String>) -> SubmissionView {
    SubmissionView {
        id: request.id().0.clone(),
        publisher_id: request.publisher_id().0.clone(),
        kind: request.kind(),
        status: request.status(),
        step: request.step(),
        details: request.details().clone(),
        dates: DatesView {
            submitted: request.dates().submitted(),
            verifying: request.dates().verifying(),
            verified: request.dates().verified(),
            rejected: request.dates().rejected(),
        },
        rejection_reason: request.rejection_reason().map(str::to_owned),
        messages: request.messages().to_vec(),
        is_reapproval: request.is_reapproval(),
        target_listing_id: request.target_listing_id().map(|id| id.0.clone()),
        notice,
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn storage_error(error: RepositoryError) -> (StatusCode, Json<ApiError>) {
    error!(
        event_name = "api.storage_error",
        error = %error,
        "repository operation failed"
    );
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiError { error: "storage temporarily unavailable".to_string() }),
    )
}

fn domain_error(error: DomainError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        DomainError::InvalidSubmissionTransition { .. } => StatusCode::CONFLICT,
        DomainError::Catalog(
            CatalogError::ConfirmationRequired | CatalogError::ReapprovalInProgress { .. },
        ) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(ApiError { error: error.to_string() }))
}

fn not_found(what: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::NOT_FOUND, Json(ApiError { error: format!("{what} not found") }))
}

// ---------------------------------------------------------------------------
// Workflow plumbing
// ---------------------------------------------------------------------------

fn workflow() -> (SubmissionWorkflow<TracingAuditSink, InMemoryNotificationSink>, InMemoryNotificationSink)
{
    let notify = InMemoryNotificationSink::default();
    (SubmissionWorkflow::new(TracingAuditSink, notify.clone()), notify)
}

fn audit_ctx(submission_id: Option<SubmissionId>, actor: &str) -> AuditContext {
    AuditContext::new(submission_id, Uuid::new_v4().to_string(), actor)
}

fn last_notice(notify: &InMemoryNotificationSink) -> Option<String> {
    notify.notices().last().map(|notice| notice.message.clone())
}

async fn load_submission(
    state: &ApiState,
    id: &str,
) -> Result<SubmissionRequest, (StatusCode, Json<ApiError>)> {
    SqlSubmissionRepository::new(state.db_pool.clone())
        .find_by_id(&SubmissionId(id.to_string()))
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found("submission"))
}

// ---------------------------------------------------------------------------
// Catalog handlers
// ---------------------------------------------------------------------------

async fn list_catalog(
    State(state): State<ApiState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Vec<ApprovedListing>> {
    let listings = SqlListingRepository::new(state.db_pool.clone())
        .list_published(query.resource_type, query.search.as_deref(), LIST_LIMIT)
        .await
        .map_err(storage_error)?;

    Ok(Json(listings))
}

async fn get_listing(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<ApprovedListing> {
    let listing = SqlListingRepository::new(state.db_pool.clone())
        .find_by_id(&ListingId(id))
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found("listing"))?;

    Ok(Json(listing))
}

// ---------------------------------------------------------------------------
// Submission handlers
// ---------------------------------------------------------------------------

async fn create_submission(
    State(state): State<ApiState>,
    Json(body): Json<CreateSubmissionBody>,
) -> ApiResult<SubmissionView> {
    let (engine, notify) = workflow();
    let request = engine.submit(
        PublisherId(body.publisher_id),
        body.details,
        body.is_reapproval,
        &audit_ctx(None, PUBLISHER_ACTOR),
    );

    SqlSubmissionRepository::new(state.db_pool.clone())
        .save(request.clone())
        .await
        .map_err(storage_error)?;

    Ok(Json(submission_view(&request, last_notice(&notify))))
}

async fn get_submission(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<SubmissionView> {
    let request = load_submission(&state, &id).await?;
    Ok(Json(submission_view(&request, None)))
}

async fn cancel_submission(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<CancelResponse> {
    let request = load_submission(&state, &id).await?;

    let (engine, notify) = workflow();
    engine
        .cancel(&request, &audit_ctx(Some(request.id().clone()), PUBLISHER_ACTOR))
        .map_err(domain_error)?;

    SqlSubmissionRepository::new(state.db_pool.clone())
        .delete(request.id())
        .await
        .map_err(storage_error)?;

    Ok(Json(CancelResponse { cancelled: true, notice: last_notice(&notify) }))
}

async fn resubmit_submission(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<ResubmitBody>,
) -> ApiResult<SubmissionView> {
    let request = load_submission(&state, &id).await?;

    let (engine, notify) = workflow();
    let replacement = engine
        .resubmit(
            &request,
            body.details,
            &audit_ctx(Some(request.id().clone()), PUBLISHER_ACTOR),
        )
        .map_err(domain_error)?;

    SqlSubmissionRepository::new(state.db_pool.clone())
        .save(replacement.clone())
        .await
        .map_err(storage_error)?;

    Ok(Json(submission_view(&replacement, last_notice(&notify))))
}

async fn add_message(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<MessageBody>,
) -> ApiResult<SubmissionView> {
    let mut request = load_submission(&state, &id).await?;
    request.push_message(body.sender, body.text);

    SqlSubmissionRepository::new(state.db_pool.clone())
        .save(request.clone())
        .await
        .map_err(storage_error)?;

    Ok(Json(submission_view(&request, None)))
}

async fn edit_listing(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<EditListingBody>,
) -> ApiResult<EditResponse> {
    let listings = SqlListingRepository::new(state.db_pool.clone());
    let listing = listings
        .find_by_id(&ListingId(id))
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found("listing"))?;

    let ack = if body.ack { ReapprovalAck::Confirmed } else { ReapprovalAck::NotConfirmed };
    let plan =
        catalog::plan_edit(&listing, body.edit, ack).map_err(|e| domain_error(e.into()))?;

    match plan {
        EditPlan::SaveDirect(updated) => {
            listings.save(updated.clone()).await.map_err(storage_error)?;
            Ok(Json(EditResponse { listing: updated, request: None, notice: None }))
        }
        EditPlan::EnterReapproval { listing: parked, request } => {
            SqlSubmissionRepository::new(state.db_pool.clone())
                .save(request.clone())
                .await
                .map_err(storage_error)?;
            listings.save(parked.clone()).await.map_err(storage_error)?;

            info!(
                event_name = "catalog.reapproval_entered",
                listing_id = %parked.id.0,
                submission_id = %request.id().0,
                "approved listing re-entered review after basic-info edit"
            );

            Ok(Json(EditResponse {
                listing: parked,
                request: Some(submission_view(&request, None)),
                notice: Some(submission_received_copy(true).to_string()),
            }))
        }
    }
}

// ---------------------------------------------------------------------------
// Back-office handlers
// ---------------------------------------------------------------------------

async fn list_submissions(
    State(state): State<ApiState>,
    Query(query): Query<ReviewQueueQuery>,
) -> ApiResult<Vec<SubmissionView>> {
    let requests = SqlSubmissionRepository::new(state.db_pool.clone())
        .list_by_status(query.status, LIST_LIMIT)
        .await
        .map_err(storage_error)?;

    Ok(Json(requests.iter().map(|request| submission_view(request, None)).collect()))
}

async fn begin_verification(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<SubmissionView> {
    let mut request = load_submission(&state, &id).await?;

    let (engine, _notify) = workflow();
    engine
        .begin_verification(&mut request, &audit_ctx(Some(request.id().clone()), ADMIN_ACTOR))
        .map_err(domain_error)?;

    SqlSubmissionRepository::new(state.db_pool.clone())
        .save(request.clone())
        .await
        .map_err(storage_error)?;

    Ok(Json(submission_view(&request, None)))
}

async fn approve_submission(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<SubmissionView> {
    let mut request = load_submission(&state, &id).await?;

    let (engine, notify) = workflow();
    engine
        .approve(&mut request, &audit_ctx(Some(request.id().clone()), ADMIN_ACTOR))
        .map_err(domain_error)?;

    SqlSubmissionRepository::new(state.db_pool.clone())
        .save(request.clone())
        .await
        .map_err(storage_error)?;

    apply_approval_effects(&state, &request).await?;

    Ok(Json(submission_view(&request, last_notice(&notify))))
}

async fn reject_submission(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> ApiResult<SubmissionView> {
    let mut request = load_submission(&state, &id).await?;

    let (engine, notify) = workflow();
    engine
        .reject(&mut request, &body.reason, &audit_ctx(Some(request.id().clone()), ADMIN_ACTOR))
        .map_err(domain_error)?;

    SqlSubmissionRepository::new(state.db_pool.clone())
        .save(request.clone())
        .await
        .map_err(storage_error)?;

    // A rejected re-approval returns the listing to the catalog unchanged.
    if let Some(listing_id) = request.target_listing_id() {
        let listings = SqlListingRepository::new(state.db_pool.clone());
        if let Some(listing) = listings.find_by_id(listing_id).await.map_err(storage_error)? {
            let resolved = catalog::resolve_reapproval(&listing, &request)
                .map_err(|e| domain_error(e.into()))?;
            listings.save(resolved).await.map_err(storage_error)?;
        }
    }

    Ok(Json(submission_view(&request, last_notice(&notify))))
}

async fn apply_approval_effects(
    state: &ApiState,
    request: &SubmissionRequest,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    let listings = SqlListingRepository::new(state.db_pool.clone());

    if let Some(listing_id) = request.target_listing_id() {
        let listing = listings
            .find_by_id(listing_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| not_found("listing"))?;
        let resolved =
            catalog::resolve_reapproval(&listing, request).map_err(|e| domain_error(e.into()))?;
        listings.save(resolved).await.map_err(storage_error)?;

        info!(
            event_name = "catalog.reapproval_resolved",
            listing_id = %listing_id.0,
            submission_id = %request.id().0,
            "re-approved listing returned to the catalog"
        );
        return Ok(());
    }

    match request.kind() {
        RequestKind::GeneralListing => {
            let listing =
                catalog::publish_listing(request).map_err(|e| domain_error(e.into()))?;
            listings.save(listing.clone()).await.map_err(storage_error)?;

            info!(
                event_name = "catalog.listing_published",
                listing_id = %listing.id.0,
                submission_id = %request.id().0,
                "verified submission published to the catalog"
            );
        }
        RequestKind::HostedService => {
            let service = catalog::activate_hosted_service(request)
                .map_err(|e| domain_error(e.into()))?;
            SqlHostedServiceRepository::new(state.db_pool.clone())
                .save(service.clone())
                .await
                .map_err(storage_error)?;

            info!(
                event_name = "catalog.hosted_service_activated",
                hosted_service_id = %service.id.0,
                submission_id = %request.id().0,
                "verified hosting request activated"
            );
        }
    }

    Ok(())
}

async fn list_accounts(State(state): State<ApiState>) -> ApiResult<Vec<Account>> {
    let accounts = SqlAccountRepository::new(state.db_pool.clone())
        .list_all(LIST_LIMIT)
        .await
        .map_err(storage_error)?;

    Ok(Json(accounts))
}

async fn list_payments(State(state): State<ApiState>) -> ApiResult<Vec<PaymentRecord>> {
    let payments = SqlPaymentRepository::new(state.db_pool.clone())
        .list_all(LIST_LIMIT)
        .await
        .map_err(storage_error)?;

    Ok(Json(payments))
}

async fn list_hosted_services(State(state): State<ApiState>) -> ApiResult<Vec<HostedService>> {
    let services = SqlHostedServiceRepository::new(state.db_pool.clone())
        .list_all(LIST_LIMIT)
        .await
        .map_err(storage_error)?;

    Ok(Json(services))
}

async fn suspend_hosted_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<HostedService> {
    set_hosted_service_active(&state, &id, false).await
}

async fn resume_hosted_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<HostedService> {
    set_hosted_service_active(&state, &id, true).await
}

async fn set_hosted_service_active(
    state: &ApiState,
    id: &str,
    active: bool,
) -> ApiResult<HostedService> {
    let repo = SqlHostedServiceRepository::new(state.db_pool.clone());
    let mut service = repo
        .find_by_id(&HostedServiceId(id.to_string()))
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found("hosted service"))?;

    service.active = active;
    repo.save(service.clone()).await.map_err(storage_error)?;

    info!(
        event_name = "catalog.hosted_service_toggled",
        hosted_service_id = %service.id.0,
        active,
        "hosted service availability changed"
    );

    Ok(Json(service))
}
