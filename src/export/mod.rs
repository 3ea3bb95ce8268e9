//! Renderers that turn a [`StatsSnapshot`] into a wire format.
//!
//! Exporters only ever see the finished snapshot, so adding a format never
//! touches the aggregation path.

pub mod prometheus;

pub use prometheus::PrometheusExporter;

use crate::metrics::StatsSnapshot;

/// A downstream consumer of snapshots.
pub trait Exporter: Send + Sync {
    /// Value for the HTTP `Content-Type` header
    fn content_type(&self) -> &'static str;

    fn render(&self, snapshot: &StatsSnapshot) -> String;
}

/// The snapshot as-is, serialized with serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, snapshot: &StatsSnapshot) -> String {
        serde_json::to_string(snapshot).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StatsRegistry;

    #[test]
    fn json_round_trips_through_value() {
        let registry = StatsRegistry::default();
        registry.record_request("/orders", "GET", 200, 50);
        registry.record_request("/orders", "GET", 500, 900);

        let body = JsonExporter.render(&registry.snapshot());
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["total_requests"], 2);
        assert_eq!(value["endpoints"][0]["endpoint"], "/orders");
        assert_eq!(value["endpoints"][0]["status_code_counts"]["500"], 1);
        assert_eq!(value["endpoints"][0]["average_duration_ms"], 475.0);
    }

    #[test]
    fn exporters_are_object_safe() {
        let exporters: Vec<Box<dyn Exporter>> =
            vec![Box::new(JsonExporter), Box::new(PrometheusExporter)];
        let snapshot = StatsRegistry::default().snapshot();
        for exporter in &exporters {
            assert!(!exporter.content_type().is_empty());
            let _ = exporter.render(&snapshot);
        }
    }
}
