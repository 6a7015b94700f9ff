//! Threat Module
//!
//! Classifies detections into threat levels. This is the first step of the
//! response pipeline: Detection -> classify() -> dispatch.
//!
//! ## Structure
//! - `types`: Detection, ThreatLevel, ThreatAssessment
//! - `rules`: threshold constants and the configurable triple
//! - `classifier`: classification logic and input validation

pub mod classifier;
pub mod rules;
pub mod types;

pub use classifier::{classify, level_for};
pub use rules::ThresholdConfig;
pub use types::{BoundingBox, Detection, ThreatAssessment, ThreatLevel};
