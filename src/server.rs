use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::StatsOptions;
use crate::handlers;
use crate::handlers::orders::OrderBook;
use crate::metrics::{stream, StatsRegistry};
use crate::middleware::{instrument, Instrumentation};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// The aggregator — the middleware writes, snapshot routes read.
    pub registry: Arc<StatsRegistry>,

    pub options: Arc<StatsOptions>,

    /// Demo data behind the /api/orders endpoints.
    pub orders: OrderBook,

    /// Flag checked by every simulation worker on each iteration.
    pub simulation_running: Arc<AtomicBool>,

    /// Handle to the spawned simulation task so we can await clean shutdown.
    pub simulation_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppState {
    pub fn new(options: StatsOptions) -> Self {
        Self {
            registry: Arc::new(StatsRegistry::from_options(&options)),
            options: Arc::new(options),
            orders: OrderBook::new(),
            simulation_running: Arc::new(AtomicBool::new(false)),
            simulation_handle: tokio::sync::Mutex::new(None),
        }
    }
}

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let instrumentation = Instrumentation::new(state.registry.clone(), &state.options);

    let mut router = Router::new()
        // ── Demo endpoints ──────────────────────────────────────
        .route(
            "/api/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/api/orders/:id", get(handlers::orders::get_order))
        .route("/api/faults/panic", get(handlers::orders::panic_fault))
        // ── Simulation control ──────────────────────────────────
        .route(
            "/api/simulation/start",
            post(handlers::simulation::start_simulation),
        )
        .route(
            "/api/simulation/stop",
            post(handlers::simulation::stop_simulation),
        )
        .route(
            "/api/simulation/status",
            get(handlers::simulation::simulation_status),
        )
        // ── Dashboard and snapshots ─────────────────────────────
        .route("/apiMetricDashboard", get(stream::dashboard))
        .route("/apiMetricDashboard-data", get(stream::get_metrics))
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/stream", get(stream::metrics_stream));

    if state.options.enable_prometheus {
        router = router.route("/metrics", get(stream::prometheus_metrics));
    }

    router
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(instrumentation, instrument))
        .layer(CorsLayer::permissive())
}
