//! Configuration validation.
//!
//! Bad thresholds are fatal at init: the pipeline never starts on a
//! configuration that fails here.

use crate::config::{
    ClassifierConfig, Config, FrameConfig, MotionConfig, SafetyConfig, TargetingConfig,
    TrackerConfig,
};
use crate::constants::{motion, safety, tracker};
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_frame(&config.frame)?;
    validate_motion(&config.motion)?;
    validate_tracker(&config.tracker)?;
    validate_classifier(&config.classifier)?;
    validate_targeting(&config.targeting)?;
    validate_safety(&config.safety)?;
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

/// Validate frame geometry.
pub fn validate_frame(frame: &FrameConfig) -> Result<()> {
    // Morphology needs an interior, so anything under 3x3 is meaningless.
    if frame.width < 3 || frame.height < 3 {
        return Err(invalid(format!(
            "frame must be at least 3x3 pixels, got {}x{}",
            frame.width, frame.height
        )));
    }
    Ok(())
}

/// Validate motion detector settings.
pub fn validate_motion(config: &MotionConfig) -> Result<()> {
    for (name, rate) in [
        ("learning_rate", config.learning_rate),
        ("warmup_learning_rate", config.warmup_learning_rate),
    ] {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(invalid(format!(
                "{name} must be in (0.0, 1.0], got {rate}"
            )));
        }
    }

    if config.threshold == 0 || config.threshold == u8::MAX {
        return Err(invalid(format!(
            "threshold must be between 1 and 254, got {}",
            config.threshold
        )));
    }

    if config.min_area == 0 || config.min_area > config.max_area {
        return Err(invalid(format!(
            "area bounds must satisfy 0 < min_area <= max_area, got {}..{}",
            config.min_area, config.max_area
        )));
    }

    if !(config.min_aspect > 0.0 && config.min_aspect <= config.max_aspect) {
        return Err(invalid(format!(
            "aspect bounds must satisfy 0 < min_aspect <= max_aspect, got {}..{}",
            config.min_aspect, config.max_aspect
        )));
    }

    if !(1..=motion::MAX_REGIONS).contains(&config.max_regions) {
        return Err(invalid(format!(
            "max_regions must be between 1 and {}, got {}",
            motion::MAX_REGIONS,
            config.max_regions
        )));
    }

    if config.fill_capacity < config.max_area as usize {
        return Err(invalid(format!(
            "fill_capacity ({}) must be at least max_area ({})",
            config.fill_capacity, config.max_area
        )));
    }

    Ok(())
}

/// Validate object tracker settings.
pub fn validate_tracker(config: &TrackerConfig) -> Result<()> {
    if config.max_distance == 0 {
        return Err(invalid("max_distance must be at least 1".to_string()));
    }

    if !(2..=tracker::MAX_HISTORY).contains(&config.history_length) {
        return Err(invalid(format!(
            "history_length must be between 2 and {}, got {}",
            tracker::MAX_HISTORY,
            config.history_length
        )));
    }

    if !(1..=tracker::MAX_TRACKS).contains(&config.max_tracks) {
        return Err(invalid(format!(
            "max_tracks must be between 1 and {}, got {}",
            tracker::MAX_TRACKS,
            config.max_tracks
        )));
    }

    Ok(())
}

/// Validate behavior classifier settings.
pub fn validate_classifier(config: &ClassifierConfig) -> Result<()> {
    if config.min_size > config.max_size {
        return Err(invalid(format!(
            "min_size ({}) must not exceed max_size ({})",
            config.min_size, config.max_size
        )));
    }

    if config.target_min > config.target_max {
        return Err(invalid(format!(
            "target_min ({}) must not exceed target_max ({})",
            config.target_min, config.target_max
        )));
    }

    if config.hover_time_ms == 0 {
        return Err(invalid("hover_time_ms must be at least 1".to_string()));
    }

    Ok(())
}

/// Validate targeting settings.
pub fn validate_targeting(config: &TargetingConfig) -> Result<()> {
    if !(config.fov_h_deg > 0.0 && config.fov_v_deg > 0.0) {
        return Err(invalid(format!(
            "field of view must be positive, got {}x{}",
            config.fov_h_deg, config.fov_v_deg
        )));
    }

    if !(config.scale_pan > 0.0 && config.scale_tilt > 0.0) {
        return Err(invalid(format!(
            "calibration scale must be positive, got pan={} tilt={}",
            config.scale_pan, config.scale_tilt
        )));
    }

    if config.engage_duration_ms == 0 {
        return Err(invalid("engage_duration_ms must be at least 1".to_string()));
    }

    if config.medium_pulse_ms == Some(0) {
        return Err(invalid(
            "medium_pulse_ms must be at least 1 (omit it to disable)".to_string(),
        ));
    }

    Ok(())
}

/// Validate safety ceilings. Only tightening is allowed.
pub fn validate_safety(config: &SafetyConfig) -> Result<()> {
    if !(1..=safety::MAX_CONTINUOUS_MS).contains(&config.max_continuous_ms) {
        return Err(invalid(format!(
            "max_continuous_ms must be between 1 and {}, got {}",
            safety::MAX_CONTINUOUS_MS,
            config.max_continuous_ms
        )));
    }

    if !(1..=safety::WATCHDOG_TIMEOUT_MS).contains(&config.watchdog_timeout_ms) {
        return Err(invalid(format!(
            "watchdog_timeout_ms must be between 1 and {}, got {}",
            safety::WATCHDOG_TIMEOUT_MS,
            config.watchdog_timeout_ms
        )));
    }

    if config.watchdog_warning_ms >= config.watchdog_timeout_ms {
        return Err(invalid(format!(
            "watchdog_warning_ms ({}) must be below watchdog_timeout_ms ({})",
            config.watchdog_warning_ms, config.watchdog_timeout_ms
        )));
    }

    if config.brownout_mv < safety::BROWNOUT_MV {
        return Err(invalid(format!(
            "brownout_mv must be at least {}, got {}",
            safety::BROWNOUT_MV,
            config.brownout_mv
        )));
    }

    if config.voltage_warning_mv < config.brownout_mv {
        return Err(invalid(format!(
            "voltage_warning_mv ({}) must not be below brownout_mv ({})",
            config.voltage_warning_mv, config.brownout_mv
        )));
    }

    if config.monitor_interval_ms == 0 || config.monitor_interval_ms >= config.watchdog_timeout_ms
    {
        return Err(invalid(format!(
            "monitor_interval_ms must be between 1 and the watchdog timeout, got {}",
            config.monitor_interval_ms
        )));
    }

    Ok(())
}
