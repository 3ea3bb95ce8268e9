use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Upper bounds (inclusive, milliseconds) of the lifetime duration buckets.
/// Same boundaries as the Prometheus client defaults, expressed in ms.
pub const DEFAULT_BOUNDS_MS: [u64; 11] =
    [5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];

/// Fixed-bucket duration counts covering the whole process lifetime.
///
/// Unlike the sample window this never forgets, which is what a
/// Prometheus histogram needs. Every bucket is a plain atomic so
/// `record` stays lock-free.
#[derive(Debug)]
pub struct DurationBuckets {
    /// One counter per bound plus a trailing overflow bucket.
    counts: [AtomicU64; DEFAULT_BOUNDS_MS.len() + 1],
}

/// Non-cumulative copy of the bucket counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub bounds_ms: Vec<u64>,
    /// `bounds_ms.len() + 1` entries; the last one counts everything above
    /// the largest bound.
    pub counts: Vec<u64>,
}

impl DurationBuckets {
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn record(&self, duration_ms: u64) {
        // partition_point gives the first bound >= value, i.e. the `le` bucket
        let idx = DEFAULT_BOUNDS_MS.partition_point(|&bound| bound < duration_ms);
        if let Some(counter) = self.counts.get(idx) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> BucketCounts {
        BucketCounts {
            bounds_ms: DEFAULT_BOUNDS_MS.to_vec(),
            counts: self
                .counts
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
        }
    }
}

impl Default for DurationBuckets {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketCounts {
    /// Running totals in bound order, as Prometheus `_bucket` lines expect.
    /// The final element is the `+Inf` bucket.
    pub fn cumulative(&self) -> Vec<u64> {
        self.counts
            .iter()
            .scan(0u64, |acc, &c| {
                *acc = acc.saturating_add(c);
                Some(*acc)
            })
            .collect()
    }
}
