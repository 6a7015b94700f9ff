//! Threat Types
//!
//! Core types for threat classification. No logic here, only data
//! structures shared across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::ThresholdConfig;

// ============================================================================
// DETECTION INPUT
// ============================================================================

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// A zero-area box used when no real detection geometry exists
    /// (manual override with no detection context).
    pub fn empty() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 >= self.x0
            && self.y1 >= self.y0
    }

    /// Coordinates in wire order `[x0, y0, x1, y1]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// A single object-recognition event produced by the external inference
/// pipeline. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Unique detection id assigned by the producer.
    pub id: String,
    /// Detected object class (e.g. "drone", "bird").
    pub class_name: String,
    /// Model confidence in [0, 1].
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub camera_id: String,
    pub observed_at: DateTime<Utc>,
}

// ============================================================================
// THREAT LEVEL
// ============================================================================

/// Ordinal threat classification. Total order: Low < Medium < High < Critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Wire representation used by the response backend contract.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        }
    }

    pub fn severity_level(&self) -> u8 {
        match self {
            ThreatLevel::Low => 0,
            ThreatLevel::Medium => 1,
            ThreatLevel::High => 2,
            ThreatLevel::Critical => 3,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ASSESSMENT RESULT
// ============================================================================

/// Result of classifying one detection. Derived and immutable; always
/// travels with the detection it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub detection_id: String,
    pub level: ThreatLevel,
    pub confidence: f32,
    pub thresholds_used: ThresholdConfig,
}
