//! Configuration error types.

use std::path::PathBuf;

/// Errors raised while loading, saving or checking a [`WorldConfig`](crate::config::WorldConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a config or report file.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Maps need at least two cells along each axis.
    #[error("invalid dimensions {width}x{height}: both must be at least 2")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid octave multiplier {0}: must be finite and positive")]
    InvalidOctaveMultiplier(f64),
}
