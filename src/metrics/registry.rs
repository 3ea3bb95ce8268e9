use std::sync::Arc;

use dashmap::DashMap;

use super::accumulator::{Accumulator, Limits};
use super::error_record::ErrorRecord;
use super::snapshot::StatsSnapshot;
use super::EndpointKey;
use crate::config::StatsOptions;

/// Concurrent map from (endpoint, method) to its accumulator.
///
/// The instrumentation layer writes through `record_request` /
/// `record_error`; dashboards read through `snapshot`. Accumulators are
/// created on first sight and never removed, so an `Arc<Accumulator>`
/// handed out once stays valid and current forever.
#[derive(Debug)]
pub struct StatsRegistry {
    endpoints: DashMap<EndpointKey, Arc<Accumulator>>,
    limits: Limits,
}

impl StatsRegistry {
    pub fn new(limits: Limits) -> Self {
        Self {
            endpoints: DashMap::new(),
            limits,
        }
    }

    pub fn from_options(options: &StatsOptions) -> Self {
        Self::new(options.limits())
    }

    /// Record one completed request against its endpoint.
    pub fn record_request(&self, endpoint: &str, method: &str, status_code: u16, duration_ms: i64) {
        self.accumulator(endpoint, method)
            .record(status_code, duration_ms);
    }

    /// Store a failure in the endpoint's recent-error ring.
    pub fn record_error(&self, endpoint: &str, method: &str, record: ErrorRecord) {
        self.accumulator(endpoint, method).record_error(record);
    }

    /// Get-or-create the accumulator for a key.
    ///
    /// Steady state only takes a shard read lock. When two callers race on a
    /// new key, the shard write lock in `entry` lets exactly one insert and
    /// both get the same instance back.
    pub fn accumulator(&self, endpoint: &str, method: &str) -> Arc<Accumulator> {
        let key = EndpointKey::new(endpoint, method);
        if let Some(existing) = self.endpoints.get(&key) {
            return Arc::clone(existing.value());
        }

        let entry = self.endpoints.entry(key).or_insert_with(|| {
            tracing::debug!(endpoint, method, "tracking new endpoint");
            Arc::new(Accumulator::new(endpoint, method, self.limits))
        });
        Arc::clone(entry.value())
    }

    /// Look up an accumulator without creating one.
    pub fn get(&self, endpoint: &str, method: &str) -> Option<Arc<Accumulator>> {
        self.endpoints
            .get(&EndpointKey::new(endpoint, method))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Handles to every accumulator present right now. Each key appears
    /// once; keys inserted while this runs may or may not be included.
    pub fn accumulators(&self) -> Vec<Arc<Accumulator>> {
        self.endpoints
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Build an independent point-in-time copy of everything recorded.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::from_registry(self)
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}
