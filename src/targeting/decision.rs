//! Confidence-driven actuation policy.
//!
//! Picks at most one target per frame: the highest confidence tier, ties
//! broken by larger area, then by lower track ID. High confidence engages,
//! medium optionally fires a short pulse, low never actuates.

use super::mapper::{CoordinateMapper, TargetAngles};
use crate::classify::{ClassifiedDetection, ConfidenceTier};
use crate::config::TargetingConfig;
use crate::frame::FrameDims;
use crate::safety::ActuationRequest;
use std::cmp::Reverse;

/// The selected target and the request for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engagement {
    /// Target detection.
    pub detection: ClassifiedDetection,
    /// Angles of the target centroid.
    pub angles: TargetAngles,
    /// Request to put to the safety gate.
    pub request: ActuationRequest,
}

/// Decision step between the classifier and the safety gate.
#[derive(Debug, Clone, Copy)]
pub struct ActuationPolicy {
    mapper: CoordinateMapper,
    engage_duration_ms: u64,
    medium_pulse_ms: Option<u64>,
}

impl ActuationPolicy {
    /// Create a policy for frames of `dims`.
    #[must_use]
    pub const fn new(dims: FrameDims, config: &TargetingConfig) -> Self {
        Self {
            mapper: CoordinateMapper::new(dims, config),
            engage_duration_ms: config.engage_duration_ms,
            medium_pulse_ms: config.medium_pulse_ms,
        }
    }

    /// Coordinate mapper in use.
    #[must_use]
    pub const fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Choose a target, or `None` when nothing warrants actuation.
    #[must_use]
    pub fn decide(&self, detections: &[ClassifiedDetection]) -> Option<Engagement> {
        let target = detections.iter().max_by_key(|d| {
            (d.confidence, d.region.area, Reverse(d.track_id))
        })?;

        let duration_ms = match target.confidence {
            ConfidenceTier::High => self.engage_duration_ms,
            ConfidenceTier::Medium => self.medium_pulse_ms?,
            ConfidenceTier::Low => return None,
        };

        let angles = self
            .mapper
            .pixel_to_angles(target.region.centroid_x, target.region.centroid_y);

        Some(Engagement {
            detection: *target,
            angles,
            request: ActuationRequest::engage(angles.tilt_deg, duration_ms),
        })
    }
}
