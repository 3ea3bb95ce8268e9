use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use api_stats::config::StatsOptions;
use api_stats::logger::init_logging;
use api_stats::server::{self, AppState};

/// Demo server hosting the request-metrics aggregator.
#[derive(Debug, Parser)]
#[command(name = "api-stats", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "API_STATS_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// TOML file with stats options; defaults apply when omitted
    #[arg(long, env = "API_STATS_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless API_STATS_LOG / RUST_LOG say otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    // ── 1. Load options ──────────────────────────────────────────
    let options = match &args.config {
        Some(path) => match StatsOptions::from_file(path) {
            Ok(options) => options,
            Err(err) => {
                tracing::error!(error = %err, "cannot load stats options");
                std::process::exit(1);
            }
        },
        None => StatsOptions::default(),
    };
    tracing::info!(
        max_samples = options.max_samples_per_endpoint,
        max_errors = options.max_error_records_per_endpoint,
        prometheus = options.enable_prometheus,
        "stats options"
    );

    // ── 2. Build shared state & router ───────────────────────────
    let state = Arc::new(AppState::new(options));
    let prometheus = state.options.enable_prometheus;
    let app = server::create_router(state);

    // ── 3. Bind & serve ──────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(bind = %args.bind, error = %err, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(bind = %args.bind, "server listening");
    tracing::info!("snapshot JSON   → /apiMetricDashboard-data");
    tracing::info!("snapshot SSE    → /api/metrics/stream");
    if prometheus {
        tracing::info!("prometheus      → /metrics");
    }

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
