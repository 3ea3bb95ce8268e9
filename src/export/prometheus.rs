//! Prometheus text exposition format (version 0.0.4).

use std::fmt::{self, Write};

use super::Exporter;
use crate::metrics::{EndpointSnapshot, StatsSnapshot};

const REQUESTS_TOTAL: &str = "apistats_http_requests_total";
const DURATION_SECONDS: &str = "apistats_http_request_duration_seconds";

/// Per-endpoint request counters by status code plus a latency histogram.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusExporter;

impl Exporter for PrometheusExporter {
    fn content_type(&self) -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }

    fn render(&self, snapshot: &StatsSnapshot) -> String {
        let mut output = String::with_capacity(4096);
        match write_snapshot(&mut output, snapshot) {
            Ok(()) => output,
            Err(_) => String::new(),
        }
    }
}

fn write_snapshot(output: &mut String, snapshot: &StatsSnapshot) -> fmt::Result {
    writeln!(output, "# HELP {REQUESTS_TOTAL} Total HTTP requests counted by api-stats.")?;
    writeln!(output, "# TYPE {REQUESTS_TOTAL} counter")?;
    for ep in &snapshot.endpoints {
        write_request_counts(output, ep)?;
    }

    writeln!(
        output,
        "# HELP {DURATION_SECONDS} HTTP request duration in seconds counted by api-stats."
    )?;
    writeln!(output, "# TYPE {DURATION_SECONDS} histogram")?;
    for ep in &snapshot.endpoints {
        write_duration_histogram(output, ep)?;
    }
    Ok(())
}

fn write_request_counts(output: &mut String, ep: &EndpointSnapshot) -> fmt::Result {
    let endpoint = sanitize_label(&ep.endpoint);
    let method = sanitize_label(&ep.method);
    for (status, count) in &ep.status_code_counts {
        writeln!(
            output,
            "{REQUESTS_TOTAL}{{endpoint=\"{endpoint}\",method=\"{method}\",status_code=\"{status}\"}} {count}"
        )?;
    }
    Ok(())
}

fn write_duration_histogram(output: &mut String, ep: &EndpointSnapshot) -> fmt::Result {
    let endpoint = sanitize_label(&ep.endpoint);
    let method = sanitize_label(&ep.method);
    let labels = format!("endpoint=\"{endpoint}\",method=\"{method}\"");

    let cumulative = ep.duration_buckets.cumulative();
    for (bound_ms, count) in ep.duration_buckets.bounds_ms.iter().zip(&cumulative) {
        let le = *bound_ms as f64 / 1000.0;
        writeln!(output, "{DURATION_SECONDS}_bucket{{{labels},le=\"{le}\"}} {count}")?;
    }
    let inf = cumulative.last().copied().unwrap_or(0);
    writeln!(output, "{DURATION_SECONDS}_bucket{{{labels},le=\"+Inf\"}} {inf}")?;

    let sum_seconds = ep.total_duration_ms as f64 / 1000.0;
    writeln!(output, "{DURATION_SECONDS}_sum{{{labels}}} {sum_seconds}")?;
    writeln!(output, "{DURATION_SECONDS}_count{{{labels}}} {}", ep.total_requests)?;
    Ok(())
}

/// Escape backslash, double quote and newline in a label value.
fn sanitize_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StatsRegistry;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label(r#"test"path"#), r#"test\"path"#);
        assert_eq!(sanitize_label("test\\path"), "test\\\\path");
        assert_eq!(sanitize_label("a\nb"), "a\\nb");
    }

    #[test]
    fn empty_snapshot_has_headers_only() {
        let output = PrometheusExporter.render(&StatsRegistry::default().snapshot());
        assert!(output.contains("# TYPE apistats_http_requests_total counter"));
        assert!(output.contains("# TYPE apistats_http_request_duration_seconds histogram"));
        assert!(!output.contains("endpoint="));
    }

    #[test]
    fn counters_are_labelled_by_status() {
        let registry = StatsRegistry::default();
        registry.record_request("/orders", "GET", 200, 50);
        registry.record_request("/orders", "GET", 200, 70);
        registry.record_request("/orders", "GET", 500, 900);

        let output = PrometheusExporter.render(&registry.snapshot());
        assert!(output.contains(
            r#"apistats_http_requests_total{endpoint="/orders",method="GET",status_code="200"} 2"#
        ));
        assert!(output.contains(
            r#"apistats_http_requests_total{endpoint="/orders",method="GET",status_code="500"} 1"#
        ));
    }

    #[test]
    fn histogram_is_cumulative() {
        let registry = StatsRegistry::default();
        registry.record_request("/orders", "GET", 200, 50);
        registry.record_request("/orders", "GET", 200, 70);
        registry.record_request("/orders", "GET", 500, 900);

        let output = PrometheusExporter.render(&registry.snapshot());
        let labels = r#"endpoint="/orders",method="GET""#;
        assert!(output.contains(&format!(
            "apistats_http_request_duration_seconds_bucket{{{labels},le=\"0.05\"}} 1"
        )));
        assert!(output.contains(&format!(
            "apistats_http_request_duration_seconds_bucket{{{labels},le=\"0.1\"}} 2"
        )));
        assert!(output.contains(&format!(
            "apistats_http_request_duration_seconds_bucket{{{labels},le=\"1\"}} 3"
        )));
        assert!(output.contains(&format!(
            "apistats_http_request_duration_seconds_bucket{{{labels},le=\"+Inf\"}} 3"
        )));
        assert!(output.contains(&format!(
            "apistats_http_request_duration_seconds_sum{{{labels}}} 1.02"
        )));
        assert!(output.contains(&format!(
            "apistats_http_request_duration_seconds_count{{{labels}}} 3"
        )));
    }
}
