//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config, load_config_file, save_config, save_default_config};
pub use paths::{CONFIG_PATH_ENV, config_dir, config_file_path};
pub use types::{
    ClassifierConfig, Config, FrameConfig, MotionConfig, SafetyConfig, TargetingConfig,
    TrackerConfig,
};
pub use validate::{
    validate_classifier, validate_config, validate_frame, validate_motion, validate_safety,
    validate_targeting, validate_tracker,
};
