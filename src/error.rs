use std::path::PathBuf;

/// Result type alias using [`ConfigError`]
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Failures while loading [`StatsOptions`](crate::config::StatsOptions).
///
/// Recording and snapshotting never fail; configuration is the only
/// place the crate surfaces errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be between 1 and {max}")]
    InvalidCapacity { field: &'static str, max: usize },
}
