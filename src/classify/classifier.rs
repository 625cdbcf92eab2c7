//! Behavior classifier.
//!
//! Size comes from the larger bounding-box side. Hovering is judged from the
//! track history: the Chebyshev extent of all centroids (larger of the x and
//! y ranges) must stay under `hover_radius` while the history spans at least
//! `hover_time_ms`.

use crate::config::ClassifierConfig;
use crate::detection::MotionRegion;
use crate::tracking::{ObjectTracker, Track, TrackHistory, TrackedDetection};
use serde::Serialize;

/// Size bucket of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    /// Smaller than `min_size`.
    TooSmall,
    /// Larger than `max_size`.
    TooLarge,
    /// Plausible size but outside the target band.
    Unknown,
    /// Inside the target band.
    Target,
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSmall => write!(f, "too_small"),
            Self::TooLarge => write!(f, "too_large"),
            Self::Unknown => write!(f, "unknown"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Confidence that a detection is the target pest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    /// Wrong size.
    Low,
    /// Target-sized but passing through.
    Medium,
    /// Target-sized and hovering.
    High,
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Result of hover analysis over one history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoverAnalysis {
    /// Near-stationary for long enough.
    pub hovering: bool,
    /// Chebyshev extent of the centroids, in pixels.
    pub movement_radius: u16,
    /// Time between oldest and newest sample.
    pub span_ms: u64,
}

/// Decide whether a history describes hovering.
///
/// Fewer than two samples is never hovering.
#[must_use]
pub fn analyze_hover(history: &TrackHistory, hover_radius: u16, hover_time_ms: u64) -> HoverAnalysis {
    if history.len() < 2 {
        return HoverAnalysis::default();
    }

    let (mut min_x, mut max_x) = (u16::MAX, 0);
    let (mut min_y, mut max_y) = (u16::MAX, 0);
    for sample in history.iter() {
        min_x = min_x.min(sample.x);
        max_x = max_x.max(sample.x);
        min_y = min_y.min(sample.y);
        max_y = max_y.max(sample.y);
    }

    let movement_radius = (max_x - min_x).max(max_y - min_y);
    let span_ms = history.span_ms();

    HoverAnalysis {
        hovering: movement_radius < hover_radius && span_ms >= hover_time_ms,
        movement_radius,
        span_ms,
    }
}

/// One classified detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedDetection {
    /// Owning track.
    pub track_id: u32,
    /// Region observed this frame.
    pub region: MotionRegion,
    /// Size bucket.
    pub size_class: SizeClass,
    /// Hovering verdict; always false unless target-sized.
    pub hovering: bool,
    /// Equal to `track_age_ms` while hovering, otherwise 0.
    pub hover_duration_ms: u64,
    /// Time since the track was first seen.
    pub track_age_ms: u64,
    /// Confidence tier.
    pub confidence: ConfidenceTier,
}

/// Size and behavior classifier.
#[derive(Debug, Clone)]
pub struct BehaviorClassifier {
    config: ClassifierConfig,
}

impl BehaviorClassifier {
    /// Create a classifier.
    #[must_use]
    pub const fn new(config: &ClassifierConfig) -> Self {
        Self { config: *config }
    }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Bucket a region by its larger side.
    #[must_use]
    pub fn size_class(&self, region: &MotionRegion) -> SizeClass {
        let size = region.size();
        if size < self.config.min_size {
            SizeClass::TooSmall
        } else if size > self.config.max_size {
            SizeClass::TooLarge
        } else if (self.config.target_min..=self.config.target_max).contains(&size) {
            SizeClass::Target
        } else {
            SizeClass::Unknown
        }
    }

    /// Classify every detection of the current frame.
    ///
    /// Hover analysis runs only for target-sized detections; the others get
    /// their track age and a low tier.
    #[must_use]
    pub fn classify(
        &self,
        detections: &[TrackedDetection],
        tracker: &ObjectTracker,
    ) -> Vec<ClassifiedDetection> {
        detections
            .iter()
            .map(|detection| {
                let size_class = self.size_class(&detection.region);
                let track = tracker.track(detection.track_id);
                let track_age_ms = track.map_or(0, Track::age_ms);

                let hovering = match (size_class, track) {
                    (SizeClass::Target, Some(track)) => {
                        analyze_hover(
                            track.history(),
                            self.config.hover_radius,
                            self.config.hover_time_ms,
                        )
                        .hovering
                    }
                    _ => false,
                };

                let confidence = match (size_class, hovering) {
                    (SizeClass::Target, true) => ConfidenceTier::High,
                    (SizeClass::Target, false) => ConfidenceTier::Medium,
                    _ => ConfidenceTier::Low,
                };

                ClassifiedDetection {
                    track_id: detection.track_id,
                    region: detection.region,
                    size_class,
                    hovering,
                    hover_duration_ms: if hovering { track_age_ms } else { 0 },
                    track_age_ms,
                    confidence,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::tracking::TrackSample;

    fn region(cx: u16, cy: u16, w: u16, h: u16) -> MotionRegion {
        MotionRegion {
            x: cx - w / 2,
            y: cy - h / 2,
            w,
            h,
            area: u32::from(w) * u32::from(h),
            centroid_x: cx,
            centroid_y: cy,
        }
    }

    fn classifier() -> BehaviorClassifier {
        BehaviorClassifier::new(&ClassifierConfig::default())
    }

    #[test]
    fn test_size_buckets() {
        let c = classifier();
        assert_eq!(c.size_class(&region(100, 100, 10, 10)), SizeClass::TooSmall);
        assert_eq!(c.size_class(&region(100, 100, 18, 10)), SizeClass::Target);
        assert_eq!(c.size_class(&region(100, 100, 50, 30)), SizeClass::Target);
        assert_eq!(c.size_class(&region(100, 100, 60, 30)), SizeClass::Unknown);
        assert_eq!(c.size_class(&region(200, 200, 101, 60)), SizeClass::TooLarge);
    }

    #[test]
    fn test_single_sample_never_hovers() {
        let mut history = TrackHistory::with_capacity(4);
        history.push(TrackSample {
            x: 10,
            y: 10,
            timestamp_ms: 0,
        });
        assert!(!analyze_hover(&history, 50, 0).hovering);
    }

    #[test]
    fn test_hover_radius_is_strict() {
        let mut history = TrackHistory::with_capacity(4);
        for (x, t) in [(100, 0), (150, 1000)] {
            history.push(TrackSample {
                x,
                y: 100,
                timestamp_ms: t,
            });
        }
        let at_radius = analyze_hover(&history, 50, 1000);
        assert_eq!(at_radius.movement_radius, 50);
        assert!(!at_radius.hovering);
        assert!(analyze_hover(&history, 51, 1000).hovering);
    }

    #[test]
    fn test_hover_needs_time() {
        let mut history = TrackHistory::with_capacity(4);
        for t in [0, 500, 999] {
            history.push(TrackSample {
                x: 100,
                y: 100,
                timestamp_ms: t,
            });
        }
        let analysis = analyze_hover(&history, 50, 1000);
        assert!(!analysis.hovering);
        assert_eq!(analysis.span_ms, 999);
    }

    #[test]
    fn test_confidence_tiers_from_tracker() {
        let mut tracker = ObjectTracker::new(&TrackerConfig::default());
        let c = classifier();

        let mut last = Vec::new();
        for i in 0..12u64 {
            let jitter = (i % 3) as u16;
            let target = region(100 + jitter, 100, 30, 25);
            let small = region(300, 300 + jitter, 8, 8);
            last = tracker.update(&[target, small], i * 100);
        }

        let classified = c.classify(&last, &tracker);
        let target = classified.iter().find(|d| d.size_class == SizeClass::Target);
        let small = classified.iter().find(|d| d.size_class == SizeClass::TooSmall);

        let target = target.copied().unwrap_or_else(|| panic!("no target"));
        assert!(target.hovering);
        assert_eq!(target.confidence, ConfidenceTier::High);
        assert_eq!(target.track_age_ms, 1100);
        assert_eq!(target.hover_duration_ms, 1100);

        let small = small.copied().unwrap_or_else(|| panic!("no small"));
        assert!(!small.hovering);
        assert_eq!(small.confidence, ConfidenceTier::Low);
        assert_eq!(small.track_age_ms, 1100);
        assert_eq!(small.hover_duration_ms, 0);
    }

    #[test]
    fn test_track_age_outlives_history_window() {
        let mut tracker = ObjectTracker::new(&TrackerConfig::default());
        let mut last = Vec::new();
        for i in 0..40u64 {
            last = tracker.update(&[region(100, 100, 30, 25)], i * 100);
        }

        let classified = classifier().classify(&last, &tracker);
        let history = tracker.track(classified[0].track_id).map(|t| t.history().span_ms());
        assert_eq!(history, Some(2_900));
        assert_eq!(classified[0].track_age_ms, 3_900);
        assert!(classified[0].hovering);
        assert_eq!(classified[0].hover_duration_ms, 3_900);
    }

    #[test]
    fn test_moving_target_is_medium() {
        let mut tracker = ObjectTracker::new(&TrackerConfig::default());
        let mut last = Vec::new();
        for i in 0..5u16 {
            last = tracker.update(&[region(40 + i * 50, 100, 30, 25)], u64::from(i) * 100);
        }
        let classified = classifier().classify(&last, &tracker);
        assert_eq!(classified.len(), 1);
        assert!(!classified[0].hovering);
        assert_eq!(classified[0].confidence, ConfidenceTier::Medium);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(ConfidenceTier::High > ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium > ConfidenceTier::Low);
    }
}
