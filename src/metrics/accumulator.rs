use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::buckets::{BucketCounts, DurationBuckets};
use super::error_record::ErrorRecord;
use super::percentiles::PercentileSet;

// ─── Configuration ───────────────────────────────────────────────

/// Window slots reserved up front; larger windows grow on demand.
const PREALLOC_SAMPLES: usize = 256;

/// Per-endpoint bounds, fixed when the accumulator is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Capacity of the rolling duration window used for percentiles
    pub max_samples: usize,
    /// Capacity of the recent-error ring
    pub max_errors: usize,
    /// Observations at or above this duration count as slow
    pub slow_threshold_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_samples: 200,
            max_errors: 50,
            slow_threshold_ms: 2_000,
        }
    }
}

// ─── Public types ────────────────────────────────────────────────

/// Everything known about one (endpoint, method) pair.
///
/// Counters are atomics and never take a lock. The sample window and the
/// error ring each sit behind their own mutex, held only for the
/// append-and-evict step, so writers on different endpoints never contend.
#[derive(Debug)]
pub struct Accumulator {
    endpoint: String,
    method: String,
    limits: Limits,

    // Counters
    total_requests: AtomicU64,
    success_requests: AtomicU64,
    failed_requests: AtomicU64,
    slow_requests: AtomicU64,
    total_duration_ms: AtomicU64,
    status_codes: DashMap<u16, AtomicU64>,

    // Lifetime distribution for export
    buckets: DurationBuckets,

    // Rolling window of recent durations, oldest at the front
    samples: Mutex<VecDeque<u64>>,

    // Most recent failures, oldest at the front
    recent_errors: Mutex<VecDeque<ErrorRecord>>,
}

// ─── Accumulator impl ────────────────────────────────────────────

impl Accumulator {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>, limits: Limits) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            limits,
            total_requests: AtomicU64::new(0),
            success_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            slow_requests: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            status_codes: DashMap::new(),
            buckets: DurationBuckets::new(),
            samples: Mutex::new(VecDeque::with_capacity(limits.max_samples.min(PREALLOC_SAMPLES))),
            recent_errors: Mutex::new(VecDeque::new()),
        }
    }

    /// Record one completed request.
    ///
    /// Negative durations are clamped to zero. Status codes in `200..400`
    /// count as success, everything else as failure.
    pub fn record(&self, status_code: u16, duration_ms: i64) {
        let duration_ms = clamp_duration(duration_ms);

        // ── Counters ────────────────────────────────────────────
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ms.fetch_add(duration_ms, Ordering::Relaxed);

        if (200..400).contains(&status_code) {
            self.success_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        if duration_ms >= self.limits.slow_threshold_ms {
            self.slow_requests.fetch_add(1, Ordering::Relaxed);
        }

        self.bump_status(status_code);
        self.buckets.record(duration_ms);

        // ── Sample window ───────────────────────────────────────
        let mut samples = self.samples.lock();
        samples.push_back(duration_ms);
        while samples.len() > self.limits.max_samples {
            samples.pop_front();
        }
    }

    /// Append a failure to the recent-error ring, evicting the oldest
    /// entries once the ring is over capacity.
    pub fn record_error(&self, record: ErrorRecord) {
        let mut errors = self.recent_errors.lock();
        errors.push_back(record);
        while errors.len() > self.limits.max_errors {
            errors.pop_front();
        }
    }

    /// Nearest-rank p50/p95/p99 over the current sample window.
    ///
    /// The window is copied under the lock and sorted outside it, so
    /// writers are only held up for the copy.
    pub fn compute_percentiles(&self) -> PercentileSet {
        let mut window = self.sample_window();
        PercentileSet::from_samples(&mut window)
    }

    fn bump_status(&self, status_code: u16) {
        // Fast path: the code has been seen before, only a shard read lock
        if let Some(counter) = self.status_codes.get(&status_code) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.status_codes
            .entry(status_code)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn success_requests(&self) -> u64 {
        self.success_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn slow_requests(&self) -> u64 {
        self.slow_requests.load(Ordering::Relaxed)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms.load(Ordering::Relaxed)
    }

    /// Running mean over the whole lifetime, 0 before the first request.
    pub fn average_duration_ms(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.total_duration_ms() as f64 / total as f64
    }

    pub fn status_code_counts(&self) -> BTreeMap<u16, u64> {
        self.status_codes
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect()
    }

    /// Copy of the error ring, oldest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.lock().iter().cloned().collect()
    }

    /// Copy of the sample window, oldest first.
    pub fn sample_window(&self) -> Vec<u64> {
        self.samples.lock().iter().copied().collect()
    }

    pub fn duration_buckets(&self) -> BucketCounts {
        self.buckets.snapshot()
    }
}

fn clamp_duration(duration_ms: i64) -> u64 {
    u64::try_from(duration_ms).unwrap_or_else(|_| {
        tracing::debug!(duration_ms, "negative duration clamped to zero");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Accumulator {
        Accumulator::new("/orders", "GET", Limits::default())
    }

    #[test]
    fn orders_scenario() {
        let acc = orders();
        acc.record(200, 50);
        acc.record(200, 70);
        acc.record(500, 900);

        assert_eq!(acc.total_requests(), 3);
        assert_eq!(acc.success_requests(), 2);
        assert_eq!(acc.failed_requests(), 1);
        assert_eq!(acc.total_duration_ms(), 1_020);
        assert_eq!(acc.average_duration_ms(), 340.0);
        assert_eq!(
            acc.status_code_counts(),
            BTreeMap::from([(200, 2), (500, 1)])
        );
    }

    #[test]
    fn success_range_is_200_to_399() {
        let acc = orders();
        for status in [199, 200, 302, 399, 400, 404, 500] {
            acc.record(status, 1);
        }
        assert_eq!(acc.success_requests(), 3);
        assert_eq!(acc.failed_requests(), 4);
    }

    #[test]
    fn empty_accumulator_reads_zero() {
        let acc = orders();
        assert_eq!(acc.average_duration_ms(), 0.0);
        assert_eq!(acc.compute_percentiles(), PercentileSet::empty());
        assert!(acc.status_code_counts().is_empty());
        assert!(acc.recent_errors().is_empty());
    }

    #[test]
    fn negative_duration_is_clamped() {
        let acc = orders();
        acc.record(200, -25);
        assert_eq!(acc.total_requests(), 1);
        assert_eq!(acc.total_duration_ms(), 0);
        assert_eq!(acc.sample_window(), vec![0]);
    }

    #[test]
    fn window_keeps_last_capacity_values() {
        let limits = Limits {
            max_samples: 5,
            ..Limits::default()
        };
        let acc = Accumulator::new("/orders", "GET", limits);
        for ms in 1..=8 {
            acc.record(200, ms);
        }
        assert_eq!(acc.sample_window(), vec![4, 5, 6, 7, 8]);
        // counters still see the full history
        assert_eq!(acc.total_requests(), 8);
        assert_eq!(acc.total_duration_ms(), 36);
    }

    #[test]
    fn huge_limits_do_not_preallocate() {
        let limits = Limits {
            max_samples: usize::MAX,
            max_errors: usize::MAX,
            ..Limits::default()
        };
        let acc = Accumulator::new("/orders", "GET", limits);
        acc.record(200, 5);
        acc.record_error(ErrorRecord::new("/orders", "GET", "boom"));
        assert_eq!(acc.sample_window(), vec![5]);
        assert_eq!(acc.recent_errors().len(), 1);
    }

    #[test]
    fn percentiles_use_the_window() {
        let acc = orders();
        for ms in 1..=10 {
            acc.record(200, ms);
        }
        let set = acc.compute_percentiles();
        assert_eq!(set.p50, 5);
        assert_eq!(set.p95, 10);
        assert_eq!(set.p99, 10);
    }

    #[test]
    fn error_ring_evicts_oldest() {
        let limits = Limits {
            max_errors: 3,
            ..Limits::default()
        };
        let acc = Accumulator::new("/orders", "POST", limits);
        for i in 0..5 {
            acc.record_error(ErrorRecord::new("/orders", "POST", format!("boom {i}")));
        }
        let messages: Vec<_> = acc
            .recent_errors()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["boom 2", "boom 3", "boom 4"]);
    }

    #[test]
    fn slow_requests_use_threshold() {
        let limits = Limits {
            slow_threshold_ms: 100,
            ..Limits::default()
        };
        let acc = Accumulator::new("/orders", "GET", limits);
        acc.record(200, 99);
        acc.record(200, 100);
        acc.record(500, 250);
        assert_eq!(acc.slow_requests(), 2);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 1_000;

        let limits = Limits {
            max_samples: 64,
            max_errors: 10,
            ..Limits::default()
        };
        let acc = Accumulator::new("/orders", "GET", limits);

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let acc = &acc;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let status = if i % 4 == 0 { 500 } else { 200 };
                        acc.record(status, (t + i) as i64);
                        if i % 50 == 0 {
                            acc.record_error(ErrorRecord::new("/orders", "GET", "fail"));
                        }
                    }
                });
            }
        });

        let total = THREADS * PER_THREAD;
        assert_eq!(acc.total_requests(), total);
        assert_eq!(acc.success_requests() + acc.failed_requests(), total);
        assert_eq!(acc.failed_requests(), THREADS * PER_THREAD / 4);

        let expected_sum: u64 = (0..THREADS)
            .flat_map(|t| (0..PER_THREAD).map(move |i| t + i))
            .sum();
        assert_eq!(acc.total_duration_ms(), expected_sum);

        let status_sum: u64 = acc.status_code_counts().values().sum();
        assert_eq!(status_sum, total);

        assert_eq!(acc.sample_window().len(), 64);
        assert_eq!(acc.recent_errors().len(), 10);
    }
}
