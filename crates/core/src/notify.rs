use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::submission::SubmissionId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// Human-readable confirmation surfaced to the submitting user. Rendering is
/// the consumer's concern; the workflow only supplies the copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub submission_id: Option<SubmissionId>,
    pub occurred_at: DateTime<Utc>,
}

impl Notice {
    pub fn success(message: impl Into<String>, submission_id: Option<SubmissionId>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            submission_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn failure(message: impl Into<String>, submission_id: Option<SubmissionId>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: message.into(),
            submission_id,
            occurred_at: Utc::now(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn push(&self, notice: Notice);
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl InMemoryNotificationSink {
    pub fn notices(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(notices) => notices.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn push(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}

/// Confirmation copy shown after a submission is accepted. Re-approvals get
/// their own wording; nothing else about them differs.
pub fn submission_received_copy(is_reapproval: bool) -> &'static str {
    if is_reapproval {
        "Your updated listing was submitted for re-approval. It stays out of the catalog until review completes."
    } else {
        "Your submission was received and is awaiting review."
    }
}
