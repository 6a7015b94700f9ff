//! Ledger Types
//!
//! Response actions and the per-attempt alert request record. No storage
//! logic here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::transport::payload::TriggerPayload;

// ============================================================================
// RESPONSE ACTIONS
// ============================================================================

/// One discrete response capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Email/notification dispatch.
    Notify,
    /// RF-jammer activation.
    Jam,
    /// Security escalation. Cannot be disabled for critical threats.
    Escalate,
    /// Scheduled follow-up that releases an active jam.
    JamDeactivate,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Notify => "notify",
            ActionKind::Jam => "jam",
            ActionKind::Escalate => "escalate",
            ActionKind::JamDeactivate => "jam_deactivate",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// REQUEST LIFECYCLE
// ============================================================================

/// Lifecycle state of an alert request.
///
/// `Pending -> Sending -> {Sent | FailedRetryable -> Sending -> ... |
/// FailedPermanent}`. `Sent` and `FailedPermanent` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    Pending,
    Sending,
    Sent,
    FailedRetryable,
    FailedPermanent,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Sending => "sending",
            AlertStatus::Sent => "sent",
            AlertStatus::FailedRetryable => "failed_retryable",
            AlertStatus::FailedPermanent => "failed_permanent",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Sent | AlertStatus::FailedPermanent)
    }
}

/// One dispatch attempt record. Owned exclusively by the `ResponseLedger`;
/// the coordinator works on transient copies and writes them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRequest {
    pub id: Uuid,
    pub detection_id: String,
    pub action: ActionKind,
    pub payload: TriggerPayload,
    pub status: AlertStatus,
    /// Completed transport attempts.
    pub attempt_count: u32,
    /// Human-readable reason for the most recent failure.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRequest {
    pub fn new(detection_id: &str, action: ActionKind, payload: TriggerPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            detection_id: detection_id.to_string(),
            action,
            payload,
            status: AlertStatus::Pending,
            attempt_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Key used for duplicate suppression.
    pub fn key(&self) -> (String, ActionKind) {
        (self.detection_id.clone(), self.action)
    }
}
