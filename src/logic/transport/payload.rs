//! Wire Payloads
//!
//! Typed request bodies for the response backend. The backend contract is
//! `POST /api/trigger` with a `threat_detected` flag and a flattened
//! detection record; deactivation reuses the same body shape.

use serde::{Deserialize, Serialize};

use crate::logic::threat::{Detection, ThreatLevel};

/// Detection record as the backend expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPayload {
    pub class_name: String,
    pub confidence: f32,
    /// `[x0, y0, x1, y1]`
    pub bbox: [f32; 4],
    /// ISO-8601 timestamp of the observation.
    pub timestamp: String,
    pub threat_level: String,
}

/// Body of `POST /api/trigger`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub threat_detected: bool,
    pub detection: DetectionPayload,
}

impl TriggerPayload {
    pub fn new(detection: &Detection, level: ThreatLevel) -> Self {
        Self {
            threat_detected: true,
            detection: DetectionPayload {
                class_name: detection.class_name.clone(),
                confidence: detection.confidence,
                bbox: detection.bbox.to_array(),
                timestamp: detection.observed_at.to_rfc3339(),
                threat_level: level.as_str().to_string(),
            },
        }
    }
}
