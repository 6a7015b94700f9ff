//! Manual Override Controller
//!
//! Operator-forced dispatch: fires the full action set regardless of
//! threat level, but still honors the capability gates. An override
//! cannot activate a capability that is hard-disabled, it can only force
//! actions a capability-enabled system would have skipped because the
//! level was too low.
//!
//! Every override writes an audit entry in addition to the per-action
//! `AlertRequest` records.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::logic::ledger::{ActionKind, AlertRequest};
use crate::logic::threat::{BoundingBox, Detection, ThreatLevel};
use crate::logic::transport::AlertTransport;

use super::coordinator::{capability_enabled, DispatchCoordinator};

/// Audit record for one override, independent of the alert requests it
/// produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideAudit {
    pub id: Uuid,
    pub detection_id: String,
    /// True when the override ran without a real detection and the engine
    /// synthesized one.
    pub synthetic_detection: bool,
    pub requested: Vec<ActionKind>,
    pub fired: Vec<ActionKind>,
    /// Actions withheld by a capability gate.
    pub skipped: Vec<ActionKind>,
    pub triggered_at: DateTime<Utc>,
}

pub struct ManualOverrideController<T: AlertTransport> {
    coordinator: Arc<DispatchCoordinator<T>>,
    audit: Mutex<Vec<OverrideAudit>>,
}

impl<T: AlertTransport> ManualOverrideController<T> {
    pub fn new(coordinator: Arc<DispatchCoordinator<T>>) -> Self {
        Self {
            coordinator,
            audit: Mutex::new(Vec::new()),
        }
    }

    /// Force-dispatch all capability-enabled actions, with or without a
    /// triggering detection. Override payloads carry level CRITICAL: the
    /// operator is declaring the situation critical by hand.
    pub fn trigger(&self, detection: Option<&Detection>) -> Vec<AlertRequest> {
        let synthetic = detection.is_none();
        let owned;
        let detection = match detection {
            Some(d) => d,
            None => {
                owned = synthetic_detection();
                &owned
            }
        };

        let toggles = self.coordinator.toggles().snapshot();
        let requested = vec![ActionKind::Notify, ActionKind::Jam, ActionKind::Escalate];
        let mut fired = Vec::new();
        let mut skipped = Vec::new();
        let mut requests = Vec::new();

        for &action in &requested {
            if !capability_enabled(action, &toggles) {
                log::info!(
                    "Override: {} withheld for {} (capability disabled)",
                    action,
                    detection.id
                );
                skipped.push(action);
                continue;
            }
            requests.push(
                self.coordinator
                    .submit(detection, ThreatLevel::Critical, action),
            );
            fired.push(action);
        }

        let entry = OverrideAudit {
            id: Uuid::new_v4(),
            detection_id: detection.id.clone(),
            synthetic_detection: synthetic,
            requested,
            fired: fired.clone(),
            skipped,
            triggered_at: Utc::now(),
        };
        log::warn!(
            "Manual override {} for detection {}: fired {:?}",
            entry.id,
            detection.id,
            fired
        );
        self.audit.lock().push(entry);

        requests
    }

    /// Audit entries, oldest first.
    pub fn audit_log(&self) -> Vec<OverrideAudit> {
        self.audit.lock().clone()
    }
}

/// Stand-in detection for an override issued with no detection context.
fn synthetic_detection() -> Detection {
    Detection {
        id: format!("override-{}", Uuid::new_v4()),
        class_name: "manual-override".to_string(),
        confidence: 1.0,
        bbox: BoundingBox::empty(),
        camera_id: "operator-console".to_string(),
        observed_at: Utc::now(),
    }
}
