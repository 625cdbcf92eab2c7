//! Error types for vespa-guard.

/// Result type alias for vespa-guard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for vespa-guard.
///
/// Safety denials are deliberately not represented here: a denied actuation
/// request is an expected outcome and is returned as a `Decision`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// A working buffer could not be provisioned.
    #[error("failed to allocate {bytes} bytes for {purpose}")]
    BufferAllocation {
        /// What the buffer was for.
        purpose: &'static str,
        /// Requested size in bytes.
        bytes: usize,
    },

    /// A stage was used before `init` (or after `release`).
    #[error("{component} is not initialized")]
    NotInitialized {
        /// Name of the uninitialized component.
        component: &'static str,
    },

    /// Frame raster does not match the configured resolution.
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch {
        /// Expected raster length in bytes.
        expected: usize,
        /// Actual raster length in bytes.
        actual: usize,
    },

    /// Arming was refused by the safety gate.
    #[error("arm refused: {reason}")]
    ArmRefused {
        /// Why arming was refused.
        reason: String,
    },

    /// Manual safe-mode reset was refused.
    #[error("safe-mode reset refused: {reason}")]
    ResetRefused {
        /// Why the reset was refused.
        reason: String,
    },

    /// Failed to write an event record.
    #[error("failed to write event record")]
    EventWrite {
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to serialize an event record as JSON.
    #[error("failed to serialize event record")]
    EventSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}
