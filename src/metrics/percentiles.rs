use serde::Serialize;

/// Quantiles expressed in basis points (1/100 of a percent).
///
/// Ranks are computed with integer arithmetic so `ceil(p * n)` is exact:
/// p95 over 20 samples is rank 19, never 20 through float drift.
pub const P50_BP: u64 = 5_000;
pub const P95_BP: u64 = 9_500;
pub const P99_BP: u64 = 9_900;

const BP_SCALE: u64 = 10_000;

/// The three order statistics reported for every endpoint.
/// Serialized straight into the snapshot JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PercentileSet {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

impl PercentileSet {
    /// Sort `samples` in place and pick p50/p95/p99 by nearest rank.
    /// Returns zeroed values if there are no samples.
    pub fn from_samples(samples: &mut [u64]) -> Self {
        if samples.is_empty() {
            return Self::empty();
        }
        samples.sort_unstable();

        Self {
            p50: nearest_rank(samples, P50_BP),
            p95: nearest_rank(samples, P95_BP),
            p99: nearest_rank(samples, P99_BP),
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub const fn empty() -> Self {
        Self {
            p50: 0,
            p95: 0,
            p99: 0,
        }
    }
}

/// Nearest-rank quantile over an ascending slice.
///
/// `index = ceil(q * n) - 1`, clamped to `[0, n - 1]`. No interpolation:
/// the result is always one of the observed values. Empty input yields 0.
pub fn nearest_rank(sorted: &[u64], quantile_bp: u64) -> u64 {
    let n = sorted.len() as u64;
    if n == 0 {
        return 0;
    }
    let rank = (quantile_bp.min(BP_SCALE) * n).div_ceil(BP_SCALE);
    let index = rank.saturating_sub(1).min(n - 1) as usize;
    sorted.get(index).copied().unwrap_or(0)
}
