use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::metrics::Limits;

/// Upper bound for `max_samples_per_endpoint`
pub const MAX_SAMPLES_LIMIT: usize = 100_000;

/// Upper bound for `max_error_records_per_endpoint`
pub const MAX_ERRORS_LIMIT: usize = 10_000;

/// Settings for the aggregator and the instrumentation hook in front of it.
///
/// Read once at startup; nothing re-reads it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsOptions {
    /// Rolling window size used for p50/p95/p99
    pub max_samples_per_endpoint: usize,

    /// How many recent failures each endpoint keeps
    pub max_error_records_per_endpoint: usize,

    pub slow_request_threshold_ms: u64,

    /// Mount the Prometheus text endpoint
    pub enable_prometheus: bool,

    /// Paths never measured (case-insensitive exact match)
    pub excluded_paths: Vec<String>,

    /// Path prefixes never measured (case-insensitive)
    pub excluded_path_prefixes: Vec<String>,

    /// Query parameter names whose values are masked in error records
    pub mask_query_parameters: Vec<String>,

    /// Header names whose values are masked in error records
    pub mask_headers: Vec<String>,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            max_samples_per_endpoint: 200,
            max_error_records_per_endpoint: 50,
            slow_request_threshold_ms: 2_000,
            enable_prometheus: true,
            excluded_paths: strings(&[
                "/favicon.ico",
                "/apiMetricDashboard",
                "/apiMetricDashboard-data",
                "/metrics",
            ]),
            excluded_path_prefixes: Vec::new(),
            mask_query_parameters: strings(&["password", "token", "access_token", "api_key"]),
            mask_headers: strings(&["authorization", "cookie", "set-cookie"]),
        }
    }
}

impl StatsOptions {
    /// Parse TOML; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let options: Self = toml::from_str(raw)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let options = Self::from_toml_str(&raw)?;
        tracing::info!(path = %path.display(), "loaded stats options");
        Ok(options)
    }

    /// Both capacities must lie in `1..=LIMIT`; every endpoint holds
    /// that many entries in memory.
    pub fn validate(&self) -> Result<()> {
        check_capacity(
            "max_samples_per_endpoint",
            self.max_samples_per_endpoint,
            MAX_SAMPLES_LIMIT,
        )?;
        check_capacity(
            "max_error_records_per_endpoint",
            self.max_error_records_per_endpoint,
            MAX_ERRORS_LIMIT,
        )
    }

    /// The subset the per-endpoint accumulators are built with.
    pub fn limits(&self) -> Limits {
        Limits {
            max_samples: self.max_samples_per_endpoint,
            max_errors: self.max_error_records_per_endpoint,
            slow_threshold_ms: self.slow_request_threshold_ms,
        }
    }
}

fn check_capacity(field: &'static str, value: usize, max: usize) -> Result<()> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidCapacity { field, max })
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let options = StatsOptions::default();
        assert_eq!(options.max_samples_per_endpoint, 200);
        assert_eq!(options.max_error_records_per_endpoint, 50);
        assert!(options.enable_prometheus);
        assert_eq!(options.limits(), Limits::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = StatsOptions::from_toml_str(
            r#"
            max_samples_per_endpoint = 500
            mask_headers = ["x-api-key"]
            "#,
        );
        assert!(options.is_ok());
        let Ok(options) = options else { return };
        assert_eq!(options.max_samples_per_endpoint, 500);
        assert_eq!(options.max_error_records_per_endpoint, 50);
        assert_eq!(options.mask_headers, vec!["x-api-key".to_owned()]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = StatsOptions::from_toml_str("max_error_records_per_endpoint = 0");
        assert!(matches!(
            err,
            Err(ConfigError::InvalidCapacity {
                field: "max_error_records_per_endpoint",
                ..
            })
        ));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let err = StatsOptions::from_toml_str("max_samples_per_endpoint = 9223372036854775807");
        assert!(matches!(
            err,
            Err(ConfigError::InvalidCapacity {
                field: "max_samples_per_endpoint",
                max: MAX_SAMPLES_LIMIT,
            })
        ));

        let err = StatsOptions::from_toml_str("max_error_records_per_endpoint = 10001");
        assert!(matches!(err, Err(ConfigError::InvalidCapacity { .. })));
    }

    #[test]
    fn limits_themselves_are_accepted() {
        let raw = format!(
            "max_samples_per_endpoint = {MAX_SAMPLES_LIMIT}\nmax_error_records_per_endpoint = {MAX_ERRORS_LIMIT}"
        );
        assert!(StatsOptions::from_toml_str(&raw).is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = StatsOptions::from_toml_str("max_samples_per_endpoint = \"lots\"");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "slow_request_threshold_ms = 250").unwrap();
        writeln!(file, "enable_prometheus = false").unwrap();

        let options = StatsOptions::from_file(file.path()).unwrap();
        assert_eq!(options.slow_request_threshold_ms, 250);
        assert!(!options.enable_prometheus);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = StatsOptions::from_file("/definitely/not/here.toml");
        assert!(matches!(err, Err(ConfigError::Io { .. })));
    }
}
