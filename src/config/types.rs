//! Configuration type definitions.
//!
//! Every stage of the pipeline takes its section of [`Config`] directly, so
//! the file format and the runtime parameters cannot drift apart.

use crate::constants::{classifier, frame, motion, safety, targeting, tracker};
use serde::{Deserialize, Serialize};

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame geometry.
    pub frame: FrameConfig,
    /// Motion detector settings.
    pub motion: MotionConfig,
    /// Object tracker settings.
    pub tracker: TrackerConfig,
    /// Behavior classifier settings.
    pub classifier: ClassifierConfig,
    /// Pixel-to-angle mapping and actuation policy.
    pub targeting: TargetingConfig,
    /// Safety gate ceilings.
    pub safety: SafetyConfig,
}

/// Frame geometry shared by every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frame width in pixels.
    pub width: u16,
    /// Frame height in pixels.
    pub height: u16,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: frame::DEFAULT_WIDTH,
            height: frame::DEFAULT_HEIGHT,
        }
    }
}

/// Motion detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Background adaptation rate (alpha) once settled.
    pub learning_rate: f32,
    /// Adaptation rate during warm-up.
    pub warmup_learning_rate: f32,
    /// Frames after seeding that use the warm-up rate.
    pub warmup_frames: u32,
    /// Luminance difference that marks a pixel as foreground.
    pub threshold: u8,
    /// Minimum component area in pixels.
    pub min_area: u32,
    /// Maximum component area in pixels.
    pub max_area: u32,
    /// Minimum width/height ratio.
    pub min_aspect: f32,
    /// Maximum width/height ratio.
    pub max_aspect: f32,
    /// Maximum regions reported per frame.
    pub max_regions: usize,
    /// Flood-fill worklist capacity in pixels.
    pub fill_capacity: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            learning_rate: motion::DEFAULT_LEARNING_RATE,
            warmup_learning_rate: motion::DEFAULT_WARMUP_LEARNING_RATE,
            warmup_frames: motion::DEFAULT_WARMUP_FRAMES,
            threshold: motion::DEFAULT_THRESHOLD,
            min_area: motion::DEFAULT_MIN_AREA,
            max_area: motion::DEFAULT_MAX_AREA,
            min_aspect: motion::DEFAULT_MIN_ASPECT,
            max_aspect: motion::DEFAULT_MAX_ASPECT,
            max_regions: motion::MAX_REGIONS,
            fill_capacity: motion::DEFAULT_FILL_CAPACITY,
        }
    }
}

/// Object tracker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum centroid distance for a match, in pixels.
    pub max_distance: u32,
    /// Consecutive misses tolerated before deregistration.
    pub max_disappeared: u32,
    /// History samples kept per track.
    pub history_length: usize,
    /// Number of track slots in the pool.
    pub max_tracks: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_distance: tracker::DEFAULT_MAX_DISTANCE,
            max_disappeared: tracker::DEFAULT_MAX_DISAPPEARED,
            history_length: tracker::MAX_HISTORY,
            max_tracks: tracker::MAX_TRACKS,
        }
    }
}

/// Behavior classifier settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Smallest dimension considered.
    pub min_size: u16,
    /// Largest dimension considered.
    pub max_size: u16,
    /// Lower bound of the target size band.
    pub target_min: u16,
    /// Upper bound of the target size band.
    pub target_max: u16,
    /// Movement extent below which a track may be hovering.
    pub hover_radius: u16,
    /// History span required to confirm hovering.
    pub hover_time_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_size: classifier::DEFAULT_MIN_SIZE,
            max_size: classifier::DEFAULT_MAX_SIZE,
            target_min: classifier::DEFAULT_TARGET_MIN,
            target_max: classifier::DEFAULT_TARGET_MAX,
            hover_radius: classifier::DEFAULT_HOVER_RADIUS,
            hover_time_ms: classifier::DEFAULT_HOVER_TIME_MS,
        }
    }
}

/// Pixel-to-angle mapping and actuation policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// Horizontal field of view in degrees.
    pub fov_h_deg: f32,
    /// Vertical field of view in degrees.
    pub fov_v_deg: f32,
    /// Calibration offset added to pan.
    pub offset_pan_deg: f32,
    /// Calibration offset added to tilt.
    pub offset_tilt_deg: f32,
    /// Calibration scale applied to pan.
    pub scale_pan: f32,
    /// Calibration scale applied to tilt.
    pub scale_tilt: f32,
    /// Duration requested for a high-confidence target.
    pub engage_duration_ms: u64,
    /// Short pulse for medium-confidence targets; `None` disables it.
    pub medium_pulse_ms: Option<u64>,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            fov_h_deg: targeting::DEFAULT_FOV_H_DEG,
            fov_v_deg: targeting::DEFAULT_FOV_V_DEG,
            offset_pan_deg: 0.0,
            offset_tilt_deg: 0.0,
            scale_pan: 1.0,
            scale_tilt: 1.0,
            engage_duration_ms: targeting::DEFAULT_ENGAGE_DURATION_MS,
            medium_pulse_ms: None,
        }
    }
}

/// Safety gate ceilings.
///
/// Values may be tightened below the compiled-in limits but never relaxed
/// beyond them; validation rejects anything looser. The upward-tilt rule
/// has no setting at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Maximum continuous actuation time.
    pub max_continuous_ms: u64,
    /// Heartbeat deadline.
    pub watchdog_timeout_ms: u64,
    /// Heartbeat age that raises a warning.
    pub watchdog_warning_ms: u64,
    /// Brownout threshold in millivolts.
    pub brownout_mv: u32,
    /// Low-voltage warning threshold in millivolts.
    pub voltage_warning_mv: u32,
    /// Poll interval of the background watchdog monitor.
    pub monitor_interval_ms: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_continuous_ms: safety::MAX_CONTINUOUS_MS,
            watchdog_timeout_ms: safety::WATCHDOG_TIMEOUT_MS,
            watchdog_warning_ms: safety::WATCHDOG_WARNING_MS,
            brownout_mv: safety::BROWNOUT_MV,
            voltage_warning_mv: safety::VOLTAGE_WARNING_MV,
            monitor_interval_ms: safety::MONITOR_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_defaults() {
        let motion = MotionConfig::default();
        assert_eq!(motion.learning_rate, 0.001);
        assert_eq!(motion.threshold, 25);
        assert_eq!(motion.min_area, 100);
        assert_eq!(motion.max_area, 50_000);
        assert_eq!(motion.max_regions, 32);
    }

    #[test]
    fn test_safety_defaults_match_hard_limits() {
        let safety = SafetyConfig::default();
        assert_eq!(safety.max_continuous_ms, 10_000);
        assert_eq!(safety.watchdog_timeout_ms, 30_000);
        assert_eq!(safety.brownout_mv, 4_500);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config: Config = toml::from_str("[tracker]\nmax_distance = 42\n").unwrap_or_default();
        assert_eq!(config.tracker.max_distance, 42);
        assert_eq!(config.tracker.max_disappeared, 30);
        assert_eq!(config.frame, FrameConfig::default());
    }
}
