use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::accumulator::Accumulator;
use super::buckets::BucketCounts;
use super::error_record::ErrorRecord;
use super::registry::StatsRegistry;

/// Everything known about one endpoint at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSnapshot {
    pub endpoint: String,
    pub method: String,

    // Counters
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    pub slow_requests: u64,
    pub total_duration_ms: u64,

    // Latency
    pub average_duration_ms: f64,
    pub p50_duration_ms: u64,
    pub p95_duration_ms: u64,
    pub p99_duration_ms: u64,
    pub duration_buckets: BucketCounts,

    pub status_code_counts: BTreeMap<u16, u64>,
    pub recent_errors: Vec<ErrorRecord>,
}

/// Complete point-in-time view shipped to dashboards and exporters.
///
/// Fully owned: nothing in here points back at a live accumulator, so the
/// aggregation can keep running while this is serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub generated_at: DateTime<Utc>,

    pub total_requests: u64,
    pub total_success: u64,
    pub total_failed: u64,

    /// Unweighted mean of the per-endpoint averages.
    ///
    /// Each endpoint counts once regardless of traffic, so a rarely hit
    /// slow endpoint moves the headline figure as much as a busy fast one.
    /// This is NOT total duration divided by total requests.
    pub average_duration_ms: f64,

    pub endpoint_count: usize,
    /// Ordered by (endpoint, method)
    pub endpoints: Vec<EndpointSnapshot>,
}

impl EndpointSnapshot {
    pub fn from_accumulator(acc: &Accumulator) -> Self {
        let percentiles = acc.compute_percentiles();

        Self {
            endpoint: acc.endpoint().to_owned(),
            method: acc.method().to_owned(),
            total_requests: acc.total_requests(),
            success_requests: acc.success_requests(),
            failed_requests: acc.failed_requests(),
            slow_requests: acc.slow_requests(),
            total_duration_ms: acc.total_duration_ms(),
            average_duration_ms: acc.average_duration_ms(),
            p50_duration_ms: percentiles.p50,
            p95_duration_ms: percentiles.p95,
            p99_duration_ms: percentiles.p99,
            duration_buckets: acc.duration_buckets(),
            status_code_counts: acc.status_code_counts(),
            recent_errors: acc.recent_errors(),
        }
    }
}

impl StatsSnapshot {
    /// Walk the registry once and assemble the snapshot.
    /// No endpoints yet means an empty snapshot, not an error.
    pub fn from_registry(registry: &StatsRegistry) -> Self {
        let mut endpoints: Vec<EndpointSnapshot> = registry
            .accumulators()
            .iter()
            .map(|acc| EndpointSnapshot::from_accumulator(acc))
            .collect();
        endpoints.sort_by(|a, b| {
            (a.endpoint.as_str(), a.method.as_str()).cmp(&(b.endpoint.as_str(), b.method.as_str()))
        });

        let (total_requests, total_success, total_failed) =
            endpoints.iter().fold((0u64, 0u64, 0u64), |(t, s, f), ep| {
                (
                    t.saturating_add(ep.total_requests),
                    s.saturating_add(ep.success_requests),
                    f.saturating_add(ep.failed_requests),
                )
            });

        let average_duration_ms = if endpoints.is_empty() {
            0.0
        } else {
            endpoints.iter().map(|ep| ep.average_duration_ms).sum::<f64>()
                / endpoints.len() as f64
        };

        Self {
            generated_at: Utc::now(),
            total_requests,
            total_success,
            total_failed,
            average_duration_ms,
            endpoint_count: endpoints.len(),
            endpoints,
        }
    }

    pub fn endpoint(&self, endpoint: &str, method: &str) -> Option<&EndpointSnapshot> {
        self.endpoints
            .iter()
            .find(|ep| ep.endpoint == endpoint && ep.method == method)
    }
}
