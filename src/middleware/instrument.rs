use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;

use super::exclusion::PathFilter;
use super::masking::Masker;
use crate::config::StatsOptions;
use crate::metrics::{ErrorRecord, StatsRegistry};

/// Status recorded when a handler dies without producing a response.
pub const FAULT_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Endpoint key shared by every request that matched no route; random
/// 404 paths never create accumulators of their own.
pub const UNMATCHED_ENDPOINT: &str = "<unmatched>";

/// Failure details a handler attaches to its response extensions so the
/// middleware can put them in the endpoint's error ring.
#[derive(Debug, Clone)]
pub struct Fault {
    pub message: String,
    /// Source chain or other trace text
    pub detail: String,
}

impl Fault {
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: detail.into(),
        }
    }
}

/// State shared by every invocation of [`instrument`].
#[derive(Debug, Clone)]
pub struct Instrumentation {
    registry: Arc<StatsRegistry>,
    masker: Arc<Masker>,
    filter: Arc<PathFilter>,
    slow_threshold_ms: u64,
}

impl Instrumentation {
    pub fn new(registry: Arc<StatsRegistry>, options: &StatsOptions) -> Self {
        Self {
            registry,
            masker: Arc::new(Masker::from_options(options)),
            filter: Arc::new(PathFilter::from_options(options)),
            slow_threshold_ms: options.slow_request_threshold_ms,
        }
    }

    pub fn registry(&self) -> &Arc<StatsRegistry> {
        &self.registry
    }
}

/// Axum middleware that measures every non-excluded request.
///
/// Records `(route, method, final status, elapsed ms)` exactly once per
/// request. A panicking handler is recorded as [`FAULT_STATUS`] and turned
/// into a 500 response; a response carrying a [`Fault`] extension keeps its
/// status and additionally lands in the error ring.
///
/// Adds two response headers:
///
///   X-Response-Time-Ms  — total handler wall time in milliseconds
///   Server-Timing       — same value in the standard Server-Timing format
pub async fn instrument(State(inst): State<Instrumentation>, req: Request, next: Next) -> Response {
    if inst.filter.should_exclude(req.uri().path()) {
        return next.run(req).await;
    }

    // Route template when matched, so `/api/orders/17` and `/api/orders/18`
    // share one accumulator
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ENDPOINT.to_owned(), |m| m.as_str().to_owned());

    let method = req.method().as_str().to_owned();
    let query = req.uri().query().map(str::to_owned);
    // `next.run` takes the request by value, so the headers are copied up
    // front in case a fault needs them for the error record
    let headers = req.headers().clone();

    let start = Instant::now();
    let outcome = AssertUnwindSafe(next.run(req)).catch_unwind().await;
    let elapsed = start.elapsed();
    let elapsed_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);

    let error_record = |message: String, trace: String| {
        ErrorRecord::new(path.as_str(), method.as_str(), message)
            .with_stack_trace(trace)
            .with_query_string(
                query
                    .as_deref()
                    .map(|q| inst.masker.mask_query_string(q))
                    .unwrap_or_default(),
            )
            .with_headers(inst.masker.mask_headers(&headers))
    };

    let mut response = match outcome {
        Ok(response) => {
            if let Some(fault) = response.extensions().get::<Fault>() {
                inst.registry.record_error(
                    &path,
                    &method,
                    error_record(fault.message.clone(), fault.detail.clone()),
                );
            }
            response
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%method, %path, %message, "handler panicked");
            inst.registry
                .record_error(&path, &method, error_record(message, String::new()));
            fault_response()
        }
    };

    let status = response.status().as_u16();
    inst.registry
        .record_request(&path, &method, status, elapsed_ms);

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = elapsed_ms.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Ms", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Log ─────────────────────────────────────────────────────
    if u64::try_from(elapsed_ms).is_ok_and(|ms| ms >= inst.slow_threshold_ms) {
        tracing::debug!(status, %method, %path, elapsed_ms, "slow request");
    } else {
        tracing::debug!(status, %method, %path, elapsed_ms, "request");
    }

    response
}

fn fault_response() -> Response {
    let body = serde_json::json!({
        "error":  "internal server error",
        "status": FAULT_STATUS.as_u16(),
    });
    (FAULT_STATUS, Json(body)).into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_render() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        let from_string: Box<dyn Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn Any + Send> = Box::new(7u8);

        assert_eq!(panic_message(from_str.as_ref()), "boom");
        assert_eq!(panic_message(from_string.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "handler panicked");
    }
}
