//! In-process request metrics for HTTP services.
//!
//! Every request/response pair is folded into a per-(endpoint, method)
//! [`Accumulator`](metrics::Accumulator): lock-free counters, a bounded
//! latency window for p50/p95/p99, and a bounded ring of recent failures.
//! [`StatsRegistry::snapshot`](metrics::StatsRegistry::snapshot) produces a
//! detached, serializable view for dashboards and exporters.
//!
//! The [`middleware`] module wires the registry into axum; [`export`] turns
//! snapshots into JSON or Prometheus text.

pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod load_generator;
pub mod logger;
pub mod metrics;
pub mod middleware;
pub mod server;

pub use config::StatsOptions;
pub use error::ConfigError;
pub use metrics::{Accumulator, EndpointSnapshot, ErrorRecord, StatsRegistry, StatsSnapshot};
