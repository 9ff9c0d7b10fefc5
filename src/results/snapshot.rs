//! End-of-run snapshots
//!
//! A [`Snapshot`] freezes a whitelisted subset of the metric registry into
//! the JSON document the report generator reads back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::benchmark::{FrozenMetrics, MetricStats, TrendStats};

/// Derived statistics of one metric as stored on disk
///
/// Percentile keys keep the `p(90)` / `p(95)` spelling so files produced by
/// earlier tooling stay readable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med: Option<f64>,
    #[serde(rename = "p(90)", default, skip_serializing_if = "Option::is_none")]
    pub p90: Option<f64>,
    #[serde(rename = "p(95)", default, skip_serializing_if = "Option::is_none")]
    pub p95: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

impl MetricSummary {
    /// Full distribution view, present only when every trend field is
    pub fn trend(&self) -> Option<TrendStats> {
        Some(TrendStats {
            min: self.min?,
            avg: self.avg?,
            med: self.med?,
            p90: self.p90?,
            p95: self.p95?,
            max: self.max?,
            count: 0,
        })
    }

    /// Look up a statistic by its threshold/report name
    pub fn stat(&self, name: &str) -> Option<f64> {
        match name {
            "min" => self.min,
            "avg" => self.avg,
            "med" => self.med,
            "p(90)" => self.p90,
            "p(95)" => self.p95,
            "max" => self.max,
            "count" => self.count,
            "rate" => self.rate,
            _ => None,
        }
    }
}

impl From<&MetricStats> for MetricSummary {
    fn from(stats: &MetricStats) -> Self {
        match stats {
            MetricStats::Trend(t) => Self {
                min: Some(t.min),
                avg: Some(t.avg),
                med: Some(t.med),
                p90: Some(t.p90),
                p95: Some(t.p95),
                max: Some(t.max),
                ..Default::default()
            },
            MetricStats::Counter(c) => Self {
                count: Some(c.count),
                rate: Some(c.rate),
                ..Default::default()
            },
            MetricStats::Rate(r) => Self {
                count: Some(r.total() as f64),
                rate: Some(r.rate),
                ..Default::default()
            },
        }
    }
}

/// Immutable end-of-run serialization of selected metrics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Human-readable label of the suite that produced it
    #[serde(rename = "type")]
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, MetricSummary>,
}

impl Snapshot {
    /// Extract the named metrics; names without observations are skipped
    pub fn extract(frozen: &FrozenMetrics, label: impl Into<String>, names: &[&str]) -> Self {
        let metrics = names
            .iter()
            .filter_map(|name| {
                frozen
                    .get(name)
                    .map(|stats| (name.to_string(), MetricSummary::from(stats)))
            })
            .collect();

        Self {
            label: label.into(),
            timestamp: Utc::now(),
            metrics,
        }
    }

    /// Snapshot of every metric with observations
    pub fn full(frozen: &FrozenMetrics, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            timestamp: Utc::now(),
            metrics: frozen
                .stats
                .iter()
                .map(|(name, stats)| (name.clone(), MetricSummary::from(stats)))
                .collect(),
        }
    }

    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }

    /// Shorthand for one statistic of one metric
    pub fn stat(&self, metric: &str, stat: &str) -> Option<f64> {
        self.metric(metric).and_then(|m| m.stat(stat))
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Format as terminal table
    pub fn format_table(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "\n{:=^96}", format!(" {} ", self.label));
        let _ = writeln!(
            output,
            "{:<28} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "Metric", "min", "avg", "med", "p(90)", "p(95)", "max", "count/rate"
        );
        let _ = writeln!(output, "{:-<96}", "");

        for (name, m) in &self.metrics {
            match m.trend() {
                Some(t) => {
                    let _ = writeln!(
                        output,
                        "{:<28} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                        name, t.min, t.avg, t.med, t.p90, t.p95, t.max, ""
                    );
                }
                None => {
                    let count = m.count.map(|c| format!("{c:.0}")).unwrap_or_default();
                    let rate = m.rate.map(|r| format!("{r:.4}")).unwrap_or_default();
                    let _ = writeln!(
                        output,
                        "{:<28} {:>62} {:>9} {}",
                        name, "", count, rate
                    );
                }
            }
        }

        let _ = writeln!(output, "{:=<96}", "");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{tags, MetricRegistry, Tags};

    fn frozen_registry() -> FrozenMetrics {
        let registry = MetricRegistry::new();
        let trend = registry.trend("rest_waterfall_total_ms").unwrap();
        let calls = registry.counter("rest_total_http_calls").unwrap();
        let errors = registry.rate("rest_http_errors").unwrap();

        for v in [10.0, 20.0, 30.0, 40.0] {
            trend.add(v, &Tags::new());
        }
        calls.add(5.0, &Tags::new());
        errors.add_bool(false, &tags([("call", "user")]));
        errors.add_bool(true, &tags([("call", "orders")]));

        registry.freeze()
    }

    #[test]
    fn test_extract_selects_whitelist_and_skips_absent() {
        let frozen = frozen_registry();
        let snapshot = Snapshot::extract(
            &frozen,
            "REST Waterfall",
            &["rest_waterfall_total_ms", "rest_total_http_calls", "does_not_exist"],
        );

        assert_eq!(snapshot.metrics.len(), 2);
        assert!(snapshot.metric("does_not_exist").is_none());
        assert!(snapshot.metric("rest_http_errors").is_none());
        assert_eq!(snapshot.stat("rest_total_http_calls", "count"), Some(5.0));
        assert_eq!(snapshot.stat("rest_waterfall_total_ms", "avg"), Some(25.0));
    }

    #[test]
    fn test_rate_summary_carries_rate_and_count() {
        let snapshot = Snapshot::full(&frozen_registry(), "all");
        let errors = snapshot.metric("rest_http_errors").unwrap();
        assert_eq!(errors.rate, Some(0.5));
        assert_eq!(errors.count, Some(2.0));
        assert!(errors.trend().is_none());
    }

    #[test]
    fn test_wire_format_uses_percentile_keys() {
        let snapshot = Snapshot::extract(&frozen_registry(), "REST Waterfall", &["rest_waterfall_total_ms"]);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["type"], "REST Waterfall");
        let metric = &json["metrics"]["rest_waterfall_total_ms"];
        assert!(metric.get("p(90)").is_some());
        assert!(metric.get("p(95)").is_some());
        assert!(metric.get("count").is_none());
    }

    #[test]
    fn test_reads_existing_summary_files() {
        let raw = r#"{
            "type": "GraphQL Aggregated",
            "timestamp": "2025-01-15T10:30:00.000Z",
            "metrics": {
                "graphql_query_total_ms": {"avg": 42.1, "min": 10, "med": 40, "max": 120, "p(90)": 80, "p(95)": 95},
                "graphql_errors": {"rate": 0.01, "passes": 1, "fails": 99},
                "http_reqs": {"count": 900, "rate": 30.0}
            }
        }"#;
        let snapshot: Snapshot = serde_json::from_str(raw).unwrap();

        assert_eq!(snapshot.label, "GraphQL Aggregated");
        assert_eq!(snapshot.stat("graphql_query_total_ms", "p(95)"), Some(95.0));
        assert_eq!(snapshot.stat("graphql_errors", "rate"), Some(0.01));
        assert_eq!(snapshot.stat("http_reqs", "count"), Some(900.0));
    }

    #[test]
    fn test_format_table_lists_metrics() {
        let snapshot = Snapshot::full(&frozen_registry(), "REST Waterfall");
        let table = snapshot.format_table();
        assert!(table.contains("REST Waterfall"));
        assert!(table.contains("rest_waterfall_total_ms"));
        assert!(table.contains("rest_total_http_calls"));
    }
}
