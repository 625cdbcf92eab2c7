//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "vespa-guard";

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Frame geometry defaults.
pub mod frame {
    /// Default frame width in pixels (VGA).
    pub const DEFAULT_WIDTH: u16 = 640;
    /// Default frame height in pixels (VGA).
    pub const DEFAULT_HEIGHT: u16 = 480;
    /// Channels per pixel in the incoming raster (BGR interleaved).
    pub const CHANNELS: usize = 3;
    /// Luminance weights in 1/256 units: `(77*R + 150*G + 29*B) >> 8`.
    pub const LUMA_WEIGHT_R: u32 = 77;
    /// Green luminance weight.
    pub const LUMA_WEIGHT_G: u32 = 150;
    /// Blue luminance weight.
    pub const LUMA_WEIGHT_B: u32 = 29;
}

/// Motion detector defaults.
pub mod motion {
    /// Background adaptation rate once the model has settled.
    pub const DEFAULT_LEARNING_RATE: f32 = 0.001;
    /// Faster adaptation rate used while the background settles.
    pub const DEFAULT_WARMUP_LEARNING_RATE: f32 = 0.05;
    /// Frames after a (re)seed that use the warm-up learning rate.
    pub const DEFAULT_WARMUP_FRAMES: u32 = 100;
    /// Per-pixel luminance difference marking foreground (~10% change).
    pub const DEFAULT_THRESHOLD: u8 = 25;
    /// Minimum component area in pixels.
    pub const DEFAULT_MIN_AREA: u32 = 100;
    /// Maximum component area in pixels.
    pub const DEFAULT_MAX_AREA: u32 = 50_000;
    /// Minimum width/height ratio.
    pub const DEFAULT_MIN_ASPECT: f32 = 0.3;
    /// Maximum width/height ratio.
    pub const DEFAULT_MAX_ASPECT: f32 = 3.0;
    /// Maximum regions reported for a single frame.
    pub const MAX_REGIONS: usize = 32;
    /// Capacity of the flood-fill worklist, in pixels. Never below the
    /// maximum area.
    pub const DEFAULT_FILL_CAPACITY: usize = DEFAULT_MAX_AREA as usize;
    /// Raw foreground pixel count above which a frame "has motion".
    pub const MOTION_PIXEL_FLOOR: usize = 50;
}

/// Object tracker defaults.
pub mod tracker {
    /// Maximum centroid distance for associating a region with a track.
    pub const DEFAULT_MAX_DISTANCE: u32 = 100;
    /// Consecutive misses tolerated before a track is deregistered.
    pub const DEFAULT_MAX_DISAPPEARED: u32 = 30;
    /// Hard upper bound on history samples per track (~3 s at 10 fps).
    pub const MAX_HISTORY: usize = 30;
    /// Hard upper bound on concurrently tracked objects.
    pub const MAX_TRACKS: usize = 20;
}

/// Behavior classifier defaults (pixels at 640x480).
pub mod classifier {
    /// Smallest dimension considered at all.
    pub const DEFAULT_MIN_SIZE: u16 = 18;
    /// Largest dimension considered at all.
    pub const DEFAULT_MAX_SIZE: u16 = 100;
    /// Lower bound of the target size band.
    pub const DEFAULT_TARGET_MIN: u16 = 18;
    /// Upper bound of the target size band.
    pub const DEFAULT_TARGET_MAX: u16 = 50;
    /// Maximum centroid extent that still counts as hovering.
    pub const DEFAULT_HOVER_RADIUS: u16 = 50;
    /// Minimum history span that confirms hovering.
    pub const DEFAULT_HOVER_TIME_MS: u64 = 1_000;
}

/// Targeting and decision defaults.
pub mod targeting {
    /// Horizontal camera field of view in degrees.
    pub const DEFAULT_FOV_H_DEG: f32 = 60.0;
    /// Vertical camera field of view in degrees (4:3).
    pub const DEFAULT_FOV_V_DEG: f32 = 45.0;
    /// Duration requested when a high-confidence target is engaged.
    pub const DEFAULT_ENGAGE_DURATION_MS: u64 = 2_000;
}

/// Safety gate ceilings. These are hard limits, not tuning knobs.
pub mod safety {
    /// Maximum continuous actuation time.
    pub const MAX_CONTINUOUS_MS: u64 = 10_000;
    /// Heartbeat deadline before the watchdog latches safe mode.
    pub const WATCHDOG_TIMEOUT_MS: u64 = 30_000;
    /// Heartbeat age at which a watchdog warning is raised.
    pub const WATCHDOG_WARNING_MS: u64 = 25_000;
    /// Supply voltage below which actuation is a brownout fault.
    pub const BROWNOUT_MV: u32 = 4_500;
    /// Supply voltage below which a low-voltage warning is logged.
    pub const VOLTAGE_WARNING_MV: u32 = 4_750;
    /// Highest tilt accepted. 0 is horizontal, negative is downward.
    pub const MAX_TILT_DEG: f32 = 0.0;
    /// Default interval for the background watchdog monitor.
    pub const MONITOR_INTERVAL_MS: u64 = 100;
}

/// Simulation defaults for the `simulate` command.
pub mod simulate {
    /// Frames replayed when `--frames` is not given.
    pub const DEFAULT_FRAMES: u32 = 30;
    /// Frames per second of the synthetic feed.
    pub const DEFAULT_FPS: u32 = 10;
    /// Side length of the synthetic hornet in pixels (width).
    pub const OBJECT_WIDTH: u16 = 30;
    /// Height of the synthetic hornet in pixels.
    pub const OBJECT_HEIGHT: u16 = 25;
}
