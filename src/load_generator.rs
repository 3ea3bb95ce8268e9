use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::{ErrorRecord, StatsRegistry};

/// Synthetic endpoints: (path, method, typical latency in ms)
const ENDPOINTS: &[(&str, &str, u64)] = &[
    ("/api/orders", "GET", 20),
    ("/api/orders/:id", "GET", 8),
    ("/api/orders", "POST", 45),
    ("/api/customers", "GET", 30),
    ("/api/reports/daily", "GET", 400),
];

const FAILURE_STATUSES: &[u16] = &[400, 404, 500, 502, 503];

#[derive(Debug, Clone, Copy)]
pub struct SimulationPlan {
    pub concurrency: u32,
    pub duration_secs: u64,
    /// Percentage of observations that fail (0–100)
    pub error_pct: u8,
}

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that feed synthetic observations into
/// the registry until the deadline or the `running` flag is set to false.
pub async fn run(running: Arc<AtomicBool>, registry: Arc<StatsRegistry>, plan: SimulationPlan) {
    let deadline = Instant::now() + Duration::from_secs(plan.duration_secs);

    let mut handles = Vec::with_capacity(plan.concurrency as usize);

    for worker_id in 0..plan.concurrency {
        let running = running.clone();
        let registry = registry.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, registry, deadline, plan.error_pct).await;
        }));
    }

    // Wait for all workers to finish
    for h in handles {
        if let Err(err) = h.await {
            tracing::warn!(error = %err, "simulation worker failed");
        }
    }

    // Mark simulation as finished
    running.store(false, Ordering::SeqCst);
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    registry: Arc<StatsRegistry>,
    deadline: Instant,
    error_pct: u8,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + u64::from(id));

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        observe_once(&mut rng, &registry, error_pct);

        let pause = rng.gen_range(1..=5);
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }
}

/// Record one synthetic request, plus an error record for 5xx outcomes.
pub fn observe_once(rng: &mut StdRng, registry: &StatsRegistry, error_pct: u8) {
    let idx = rng.gen_range(0..ENDPOINTS.len());
    let Some(&(path, method, typical_ms)) = ENDPOINTS.get(idx) else {
        return;
    };

    let failed = rng.gen_range(0u8..100) < error_pct;
    let status = if failed {
        FAILURE_STATUSES
            .get(rng.gen_range(0..FAILURE_STATUSES.len()))
            .copied()
            .unwrap_or(500)
    } else if method == "POST" {
        201
    } else {
        200
    };

    // Mostly near the typical latency, with an occasional long tail
    let mut duration_ms = rng.gen_range(typical_ms / 2..=typical_ms * 2);
    if rng.gen_bool(0.02) {
        duration_ms = duration_ms.saturating_mul(rng.gen_range(5..=20));
    }

    if status >= 500 {
        registry.record_error(
            path,
            method,
            ErrorRecord::new(path, method, format!("simulated upstream failure ({status})"))
                .with_stack_trace("load_generator::observe_once"),
        );
    }
    registry.record_request(path, method, status, i64::try_from(duration_ms).unwrap_or(i64::MAX));
}
