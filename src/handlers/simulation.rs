use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::load_generator::SimulationPlan;
use crate::server::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Number of concurrent Tokio tasks feeding observations
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the simulation runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Percentage of synthetic requests that fail (0–100)
    #[serde(default = "default_error_pct")]
    pub error_pct: u8,
}

fn default_concurrency() -> u32 {
    10
}
fn default_duration() -> u64 {
    30
}
fn default_error_pct() -> u8 {
    5
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 || self.concurrency > 500 {
            return Err(AppError::BadRequest(
                "concurrency must be between 1 and 500".into(),
            ));
        }
        if self.duration_secs == 0 || self.duration_secs > 300 {
            return Err(AppError::BadRequest(
                "duration_secs must be between 1 and 300".into(),
            ));
        }
        if self.error_pct > 100 {
            return Err(AppError::BadRequest(
                "error_pct must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub message: String,
}

// ─── POST /api/simulation/start ──────────────────────────────────

pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SimulationConfig>,
) -> Result<Json<SimulationStatus>, AppError> {
    config.validate()?;

    // Flip the flag atomically so two concurrent starts can't both win
    if state
        .simulation_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(AppError::AlreadyRunning);
    }

    let msg = format!(
        "Started: {} workers × {}s, {}% failures",
        config.concurrency, config.duration_secs, config.error_pct,
    );
    tracing::info!(
        concurrency = config.concurrency,
        duration_secs = config.duration_secs,
        error_pct = config.error_pct,
        "simulation started"
    );

    let plan = SimulationPlan {
        concurrency: config.concurrency,
        duration_secs: config.duration_secs,
        error_pct: config.error_pct,
    };
    let running = state.simulation_running.clone();
    let registry = state.registry.clone();

    let handle = tokio::spawn(async move {
        crate::load_generator::run(running, registry, plan).await;
    });

    // Stash the handle so `stop` can await clean shutdown
    let mut guard = state.simulation_handle.lock().await;
    *guard = Some(handle);

    Ok(Json(SimulationStatus {
        running: true,
        message: msg,
    }))
}

// ─── POST /api/simulation/stop ───────────────────────────────────

pub async fn stop_simulation(
    State(state): State<Arc<AppState>>,
) -> Json<SimulationStatus> {
    if !state.simulation_running.load(Ordering::SeqCst) {
        return Json(SimulationStatus {
            running: false,
            message: "No simulation is running".into(),
        });
    }

    // Signal all workers to stop
    state.simulation_running.store(false, Ordering::SeqCst);

    let mut guard = state.simulation_handle.lock().await;
    if let Some(handle) = guard.take() {
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "simulation task ended abnormally");
        }
    }
    tracing::info!("simulation stopped");

    Json(SimulationStatus {
        running: false,
        message: "Simulation stopped".into(),
    })
}

// ─── GET /api/simulation/status ──────────────────────────────────

pub async fn simulation_status(
    State(state): State<Arc<AppState>>,
) -> Json<SimulationStatus> {
    let running = state.simulation_running.load(Ordering::SeqCst);
    Json(SimulationStatus {
        running,
        message: if running {
            "Simulation in progress".into()
        } else {
            "Idle".into()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(concurrency: u32, duration_secs: u64, error_pct: u8) -> SimulationConfig {
        SimulationConfig {
            concurrency,
            duration_secs,
            error_pct,
        }
    }

    #[test]
    fn accepts_defaults_and_bounds() {
        assert!(config(10, 30, 5).validate().is_ok());
        assert!(config(1, 1, 0).validate().is_ok());
        assert!(config(500, 300, 100).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(config(0, 30, 5).validate().is_err());
        assert!(config(501, 30, 5).validate().is_err());
        assert!(config(10, 0, 5).validate().is_err());
        assert!(config(10, 301, 5).validate().is_err());
        assert!(config(10, 30, 101).validate().is_err());
    }
}
