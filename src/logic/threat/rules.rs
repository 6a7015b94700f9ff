//! Threat Classification Thresholds
//!
//! Threshold constants and the configurable threshold triple. No
//! classification logic here.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

// ============================================================================
// DEFAULT THRESHOLDS
// ============================================================================

/// Below this confidence = Low
pub const LOW_THRESHOLD: f32 = 0.60;

/// Below this confidence (and >= low) = Medium
pub const MEDIUM_THRESHOLD: f32 = 0.75;

/// Below this confidence (and >= medium) = High; at or above = Critical
pub const HIGH_THRESHOLD: f32 = 0.90;

// ============================================================================
// CONFIGURABLE THRESHOLDS
// ============================================================================

/// Confidence thresholds separating the four threat bands.
///
/// Invariant: `0 <= low < medium < high <= 1`. A confidence exactly equal
/// to a threshold classifies into the band *above* it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub low: f32,
    pub medium: f32,
    pub high: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            low: LOW_THRESHOLD,
            medium: MEDIUM_THRESHOLD,
            high: HIGH_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub fn new(low: f32, medium: f32, high: f32) -> Self {
        Self { low, medium, high }
    }

    /// Validate the ordering invariant. Called once at startup; the engine
    /// treats the triple as immutable per run afterwards.
    pub fn validate(&self) -> EngineResult<()> {
        let values = [self.low, self.medium, self.high];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::InvalidConfig(
                "thresholds must be finite numbers".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.low) || !(0.0..=1.0).contains(&self.high) {
            return Err(EngineError::InvalidConfig(format!(
                "thresholds must lie in [0, 1], got {:?}",
                values
            )));
        }
        if !(self.low < self.medium && self.medium < self.high) {
            return Err(EngineError::InvalidConfig(format!(
                "thresholds must satisfy low < medium < high, got {:.2} / {:.2} / {:.2}",
                self.low, self.medium, self.high
            )));
        }
        Ok(())
    }
}
