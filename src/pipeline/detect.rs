//! Detection pipeline: motion, tracking and classification for one frame.
//!
//! Stages run strictly in order on the calling thread. A frame that fails
//! (wrong size, detector not initialised) degrades to empty output and
//! processing continues with the next one.

use crate::classify::{BehaviorClassifier, ClassifiedDetection, ConfidenceTier};
use crate::config::{Config, validate_config};
use crate::detection::MotionDetector;
use crate::error::Result;
use crate::frame::{BufferProvider, Frame, FrameDims, HeapBuffers};
use crate::tracking::{ObjectTracker, TrackedDetection};
use tracing::{debug, info, warn};

/// Everything the pipeline learned from one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Frame sequence number.
    pub sequence: u64,
    /// Frame timestamp.
    pub timestamp_ms: u64,
    /// Raw foreground changed noticeably.
    pub has_motion: bool,
    /// Regions that survived filtering.
    pub region_count: usize,
    /// Tracker output.
    pub tracked: Vec<TrackedDetection>,
    /// Classifier output.
    pub detections: Vec<ClassifiedDetection>,
    /// The frame could not be processed and yielded nothing.
    pub degraded: bool,
}

impl FrameReport {
    /// Highest confidence tier in this frame.
    #[must_use]
    pub fn best_confidence(&self) -> Option<ConfidenceTier> {
        self.detections.iter().map(|d| d.confidence).max()
    }
}

/// MotionDetector, ObjectTracker and BehaviorClassifier in sequence.
#[derive(Debug)]
pub struct DetectionPipeline {
    config: Config,
    detector: MotionDetector,
    tracker: ObjectTracker,
    classifier: BehaviorClassifier,
    frames: u64,
    degraded_frames: u64,
}

impl DetectionPipeline {
    /// Validate `config` and build every stage on the heap.
    ///
    /// # Errors
    ///
    /// Returns a validation or buffer allocation error; the pipeline does
    /// not start.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_buffers(config, &mut HeapBuffers)
    }

    /// Like [`DetectionPipeline::new`] with an explicit buffer strategy.
    ///
    /// # Errors
    ///
    /// Returns a validation or buffer allocation error.
    pub fn with_buffers(config: &Config, provider: &mut dyn BufferProvider) -> Result<Self> {
        validate_config(config)?;

        let mut detector = MotionDetector::new();
        detector.init(&config.motion, FrameDims::from(config.frame), provider)?;

        Ok(Self {
            config: config.clone(),
            detector,
            tracker: ObjectTracker::new(&config.tracker),
            classifier: BehaviorClassifier::new(&config.classifier),
            frames: 0,
            degraded_frames: 0,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Frame resolution the pipeline expects.
    #[must_use]
    pub fn dims(&self) -> FrameDims {
        FrameDims::from(self.config.frame)
    }

    /// Tracker state, for history lookups.
    #[must_use]
    pub const fn tracker(&self) -> &ObjectTracker {
        &self.tracker
    }

    /// Frames processed so far.
    #[must_use]
    pub const fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Frames that degraded to empty output.
    #[must_use]
    pub const fn degraded_frames(&self) -> u64 {
        self.degraded_frames
    }

    /// Process one frame. Never fails; errors degrade to an empty report.
    pub fn process(&mut self, frame: &Frame) -> FrameReport {
        self.frames += 1;

        let motion = match self.detector.process(frame) {
            Ok(motion) => motion,
            Err(e) => {
                self.degraded_frames += 1;
                warn!("Frame {} skipped: {e}", frame.sequence());
                return FrameReport {
                    sequence: frame.sequence(),
                    timestamp_ms: frame.timestamp_ms(),
                    degraded: true,
                    ..FrameReport::default()
                };
            }
        };

        let tracked = self.tracker.update(&motion.regions, frame.timestamp_ms());
        let detections = self.classifier.classify(&tracked, &self.tracker);

        for d in detections.iter().filter(|d| d.confidence == ConfidenceTier::High) {
            debug!(
                "Track {} hovering at ({}, {}) for {} ms",
                d.track_id, d.region.centroid_x, d.region.centroid_y, d.hover_duration_ms
            );
        }

        FrameReport {
            sequence: frame.sequence(),
            timestamp_ms: frame.timestamp_ms(),
            has_motion: motion.has_motion,
            region_count: motion.regions.len(),
            tracked,
            detections,
            degraded: false,
        }
    }

    /// Apply a new configuration with heap buffers.
    ///
    /// # Errors
    ///
    /// Returns a validation or allocation error; the old configuration
    /// stays in effect on failure.
    pub fn reconfigure(&mut self, config: &Config) -> Result<()> {
        self.reconfigure_with(config, &mut HeapBuffers)
    }

    /// Apply a new configuration. Background model and tracks start over.
    ///
    /// # Errors
    ///
    /// Returns a validation or allocation error; the old configuration
    /// stays in effect on failure.
    pub fn reconfigure_with(
        &mut self,
        config: &Config,
        provider: &mut dyn BufferProvider,
    ) -> Result<()> {
        let rebuilt = Self::with_buffers(config, provider)?;
        *self = Self {
            frames: self.frames,
            degraded_frames: self.degraded_frames,
            ..rebuilt
        };
        info!("Detection pipeline reconfigured");
        Ok(())
    }

    /// Drop the background model and all tracks, e.g. after a scene change.
    pub fn reset(&mut self) {
        self.detector.reset_background();
        self.tracker.reset();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::frame::{BudgetedBuffers, Scenario, SyntheticScene};

    fn small_config() -> Config {
        let mut config = Config::default();
        config.frame.width = 160;
        config.frame.height = 120;
        config
    }

    #[test]
    fn test_invalid_config_does_not_start() {
        let mut config = small_config();
        config.motion.threshold = 0;
        assert!(matches!(
            DetectionPipeline::new(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_budget_too_small_does_not_start() {
        let result = DetectionPipeline::with_buffers(&small_config(), &mut BudgetedBuffers::new(4096));
        assert!(matches!(result, Err(Error::BufferAllocation { .. })));
    }

    #[test]
    fn test_wrong_frame_degrades() {
        let mut pipeline = DetectionPipeline::new(&small_config()).unwrap();
        let frame = Frame::uniform(FrameDims::new(10, 10), 0, 3, 300);
        let report = pipeline.process(&frame);
        assert!(report.degraded);
        assert!(report.detections.is_empty());
        assert_eq!(report.sequence, 3);
        assert_eq!(pipeline.degraded_frames(), 1);
    }

    #[test]
    fn test_transit_scene_produces_detection() {
        let config = small_config();
        let mut pipeline = DetectionPipeline::new(&config).unwrap();
        let scene = SyntheticScene::new(Scenario::Transit, pipeline.dims(), 10);

        let mut last = FrameReport::default();
        for i in 0..3 {
            last = pipeline.process(&scene.frame(i));
        }
        assert_eq!(last.detections.len(), 1);
        assert_eq!(last.best_confidence(), Some(ConfidenceTier::Medium));
    }

    #[test]
    fn test_reconfigure_resets_state() {
        let config = small_config();
        let mut pipeline = DetectionPipeline::new(&config).unwrap();
        let scene = SyntheticScene::new(Scenario::Hover, pipeline.dims(), 10);
        for i in 0..3 {
            pipeline.process(&scene.frame(i));
        }
        assert_eq!(pipeline.tracker().active_count(), 1);

        let mut tighter = config.clone();
        tighter.motion.threshold = 40;
        pipeline.reconfigure(&tighter).unwrap();
        assert_eq!(pipeline.tracker().active_count(), 0);
        assert_eq!(pipeline.config().motion.threshold, 40);
        assert_eq!(pipeline.frames_processed(), 3);

        let mut broken = tighter.clone();
        broken.tracker.max_tracks = 0;
        assert!(pipeline.reconfigure(&broken).is_err());
        assert_eq!(pipeline.config().motion.threshold, 40);
    }
}
