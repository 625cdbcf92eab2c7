//! Platform-specific configuration paths.

use crate::constants::{APP_NAME, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "VESPA_GUARD_CONFIG";

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/vespa-guard/`
/// - macOS: `~/Library/Application Support/vespa-guard/`
/// - Windows: `%APPDATA%\vespa-guard\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the config file.
///
/// `VESPA_GUARD_CONFIG` wins over the platform directory, which lets field
/// units keep their configuration on a data partition.
pub fn config_file_path() -> Result<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV)
        && !explicit.is_empty()
    {
        return Ok(PathBuf::from(explicit));
    }
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}
