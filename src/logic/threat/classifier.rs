//! Threat Classifier
//!
//! Maps a detection's confidence onto a `ThreatLevel` using the configured
//! threshold triple. Pure and deterministic; malformed input is rejected
//! here and never reaches dispatch.

use crate::errors::{EngineError, EngineResult};

use super::rules::ThresholdConfig;
use super::types::{Detection, ThreatAssessment, ThreatLevel};

/// Classify one detection against the given thresholds.
///
/// Band boundaries belong to the *higher* band: a confidence exactly equal
/// to `thresholds.medium` classifies as High, not Medium.
pub fn classify(
    detection: &Detection,
    thresholds: &ThresholdConfig,
) -> EngineResult<ThreatAssessment> {
    validate_detection(detection)?;

    let level = level_for(detection.confidence, thresholds);

    Ok(ThreatAssessment {
        detection_id: detection.id.clone(),
        level,
        confidence: detection.confidence,
        thresholds_used: *thresholds,
    })
}

/// Band mapping for an already-validated confidence.
pub fn level_for(confidence: f32, thresholds: &ThresholdConfig) -> ThreatLevel {
    if confidence < thresholds.low {
        ThreatLevel::Low
    } else if confidence < thresholds.medium {
        ThreatLevel::Medium
    } else if confidence < thresholds.high {
        ThreatLevel::High
    } else {
        ThreatLevel::Critical
    }
}

fn validate_detection(detection: &Detection) -> EngineResult<()> {
    if !detection.confidence.is_finite() || !(0.0..=1.0).contains(&detection.confidence) {
        return Err(EngineError::InvalidDetection(format!(
            "confidence {} outside [0, 1] for detection {}",
            detection.confidence, detection.id
        )));
    }
    if !detection.bbox.is_valid() {
        return Err(EngineError::InvalidDetection(format!(
            "malformed bounding box {:?} for detection {}",
            detection.bbox, detection.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::threat::types::BoundingBox;
    use chrono::Utc;

    fn detection(confidence: f32) -> Detection {
        Detection {
            id: "det-1".to_string(),
            class_name: "drone".to_string(),
            confidence,
            bbox: BoundingBox::new(10.0, 20.0, 110.0, 140.0),
            camera_id: "cam-north".to_string(),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_band_mapping() {
        let t = ThresholdConfig::default();
        assert_eq!(classify(&detection(0.10), &t).unwrap().level, ThreatLevel::Low);
        assert_eq!(classify(&detection(0.65), &t).unwrap().level, ThreatLevel::Medium);
        assert_eq!(classify(&detection(0.80), &t).unwrap().level, ThreatLevel::High);
        assert_eq!(classify(&detection(0.94), &t).unwrap().level, ThreatLevel::Critical);
    }

    #[test]
    fn test_boundary_enters_upper_band() {
        let t = ThresholdConfig::new(0.6, 0.75, 0.9);
        assert_eq!(level_for(0.60, &t), ThreatLevel::Medium);
        assert_eq!(level_for(0.75, &t), ThreatLevel::High);
        assert_eq!(level_for(0.90, &t), ThreatLevel::Critical);
    }

    #[test]
    fn test_monotonic_in_confidence() {
        let t = ThresholdConfig::default();
        let mut prev = ThreatLevel::Low;
        for i in 0..=100 {
            let c = i as f32 / 100.0;
            let level = level_for(c, &t);
            assert!(level >= prev, "level regressed at confidence {}", c);
            prev = level;
        }
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let t = ThresholdConfig::default();
        assert!(matches!(
            classify(&detection(1.2), &t),
            Err(EngineError::InvalidDetection(_))
        ));
        assert!(classify(&detection(-0.1), &t).is_err());
        assert!(classify(&detection(f32::NAN), &t).is_err());
    }

    #[test]
    fn test_rejects_malformed_bbox() {
        let t = ThresholdConfig::default();
        let mut det = detection(0.9);
        det.bbox = BoundingBox::new(100.0, 0.0, 10.0, 50.0);
        assert!(matches!(
            classify(&det, &t),
            Err(EngineError::InvalidDetection(_))
        ));
    }

    #[test]
    fn test_pure_and_deterministic() {
        let t = ThresholdConfig::default();
        let det = detection(0.77);
        let a = classify(&det, &t).unwrap();
        let b = classify(&det, &t).unwrap();
        assert_eq!(a.level, b.level);
        assert_eq!(a.detection_id, b.detection_id);
    }
}
