use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::snapshot::StatsSnapshot;
use crate::export::{Exporter, JsonExporter, PrometheusExporter};
use crate::server::AppState;

const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");

// ─── GET /apiMetricDashboard ─────────────────────────────────────
/// Self-contained HTML page that polls `/apiMetricDashboard-data`.

pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ─── GET /apiMetricDashboard-data, GET /api/metrics ──────────────
/// Returns a single JSON snapshot — what the dashboard polls.

pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Json<StatsSnapshot> {
    Json(state.registry.snapshot())
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes a full `StatsSnapshot` as JSON every 500 ms.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let json = JsonExporter.render(&state.registry.snapshot());
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

// ─── GET /metrics ────────────────────────────────────────────────
/// Prometheus scrape target. Only mounted when enabled in the options.

pub async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let exporter = PrometheusExporter;
    let body = exporter.render(&state.registry.snapshot());
    ([(header::CONTENT_TYPE, exporter.content_type())], body)
}
