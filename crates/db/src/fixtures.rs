use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo seeds and verification contract: one submission per
/// lifecycle stage, a catalog with a parked re-approval, and back-office
/// rows.
const SEED_SUBMISSIONS: &[SeedSubmissionContract] = &[
    SeedSubmissionContract {
        submission_id: "sub-fresh-001",
        kind: "general_listing",
        status: "submitted",
        is_reapproval: false,
        description: "Fresh listing submission awaiting review",
    },
    SeedSubmissionContract {
        submission_id: "sub-review-001",
        kind: "hosted_service",
        status: "verifying",
        is_reapproval: false,
        description: "Hosting request currently under review",
    },
    SeedSubmissionContract {
        submission_id: "sub-rejected-001",
        kind: "general_listing",
        status: "rejected",
        is_reapproval: false,
        description: "Rejected submission with an open conversation thread",
    },
    SeedSubmissionContract {
        submission_id: "sub-reapproval-001",
        kind: "general_listing",
        status: "submitted",
        is_reapproval: true,
        description: "Basic-info edit of an approved listing back in review",
    },
];

const SEED_PUBLISHER_IDS: &[&str] = &["pub-signal-001", "pub-acme-001"];

const SEED_ACCOUNT_IDS: &[&str] = &["acct-member-001", "acct-member-002", "acct-admin-001"];

const SEED_LISTING_IDS: &[&str] = &["lst-orderbook-001", "lst-sentiment-001", "lst-weather-001"];

const SEED_PAYMENT_IDS: &[&str] = &["pay-0001", "pay-0002"];

struct SeedSubmissionContract {
    submission_id: &'static str,
    kind: &'static str,
    status: &'static str,
    is_reapproval: bool,
    description: &'static str,
}

/// Demo dataset for local exploration and end-to-end checks.
pub struct DemoSeedDataset;

#[derive(Clone, Debug)]
pub struct SubmissionSeedInfo {
    pub submission_id: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
}

pub struct SeedResult {
    pub submissions_seeded: Vec<SubmissionSeedInfo>,
}

pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl DemoSeedDataset {
    /// SQL fixture content for the demo dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let submissions_seeded = SEED_SUBMISSIONS
            .iter()
            .map(|submission| SubmissionSeedInfo {
                submission_id: submission.submission_id,
                kind: submission.kind,
                description: submission.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { submissions_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        checks.push(("publishers", count_by_ids(pool, "publisher", SEED_PUBLISHER_IDS).await?));
        checks.push(("accounts", count_by_ids(pool, "account", SEED_ACCOUNT_IDS).await?));
        checks.push(("listings", count_by_ids(pool, "listing", SEED_LISTING_IDS).await?));
        checks.push(("payments", count_by_ids(pool, "payment", SEED_PAYMENT_IDS).await?));

        for submission in SEED_SUBMISSIONS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM submission_request
                 WHERE id = ?1 AND kind = ?2 AND status = ?3 AND is_reapproval = ?4)",
            )
            .bind(submission.submission_id)
            .bind(submission.kind)
            .bind(submission.status)
            .bind(i64::from(submission.is_reapproval))
            .fetch_one(pool)
            .await?;
            checks.push((submission.submission_id, present == 1));
        }

        let parked_listing: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM listing
             WHERE id = 'lst-weather-001' AND visibility = 'pending_reapproval')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("parked-listing", parked_listing == 1));

        let reapproval_linked: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM submission_request
             WHERE id = 'sub-reapproval-001' AND target_listing_id = 'lst-weather-001')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("reapproval-link", reapproval_linked == 1));

        let active_service: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM hosted_service
             WHERE id = 'svc-prices-001' AND active = 1)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("hosted-service", active_service == 1));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

async fn count_by_ids(
    pool: &DbPool,
    table: &str,
    ids: &[&str],
) -> Result<bool, RepositoryError> {
    let quoted =
        ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
    let count: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id IN ({quoted})"))
            .fetch_one(pool)
            .await?;

    Ok(count == ids.len() as i64)
}
