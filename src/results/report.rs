//! Comparative HTML report
//!
//! Reads whatever suite snapshots exist and assembles a static document.
//! Every section is appended only when the numbers behind it are present;
//! sections are numbered in order of appearance.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use super::chart::{self, Chart, ChartKind, Dataset};
use super::compare::{fmt_value, pct_change, ratio};
use super::snapshot::{MetricSummary, Snapshot};
use super::storage::ResultsStorage;
use crate::benchmark::{Suite, TrendStats, HTTP_REQS, ITERATIONS};
use crate::workload::names;

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: 'Segoe UI', system-ui, -apple-system, sans-serif; background: #f8fafc; color: #1e293b; line-height: 1.6; padding: 2rem; }
        .container { max-width: 1200px; margin: 0 auto; }
        h1 { font-size: 2rem; margin-bottom: 0.25rem; color: #0f172a; }
        h2 { font-size: 1.5rem; margin: 2.5rem 0 1rem; border-bottom: 2px solid #e2e8f0; padding-bottom: 0.5rem; }
        h3 { font-size: 1.1rem; margin: 1.5rem 0 0.75rem; color: #334155; }
        .subtitle { color: #64748b; font-size: 1.1rem; }
        .timestamp { color: #94a3b8; font-size: 0.85rem; margin-bottom: 2rem; }
        .summary-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(250px, 1fr)); gap: 1.25rem; margin-bottom: 2rem; }
        .card { background: white; border-radius: 12px; padding: 1.5rem; box-shadow: 0 1px 3px rgba(0,0,0,0.1); border: 1px solid #e2e8f0; }
        .card-label { font-size: 0.85rem; color: #64748b; text-transform: uppercase; letter-spacing: 0.05em; }
        .card-value { font-size: 2rem; font-weight: 700; margin: 0.25rem 0; }
        .card-detail { font-size: 0.85rem; color: #94a3b8; }
        .card-value.rest, .val-rest { color: #ef4444; }
        .card-value.graphql, .val-gql { color: #3b82f6; }
        .card-value.improvement, .val-good { color: #10b981; }
        .chart-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; margin-bottom: 2rem; }
        .chart-container { background: white; border-radius: 12px; padding: 1.5rem; border: 1px solid #e2e8f0; }
        .chart-title { font-size: 1rem; font-weight: 600; margin-bottom: 1rem; color: #334155; }
        canvas { max-height: 400px; }
        table { width: 100%; border-collapse: collapse; margin: 1rem 0; }
        th, td { padding: 0.75rem 1rem; text-align: left; border-bottom: 1px solid #e2e8f0; }
        th { background: #f1f5f9; font-weight: 600; font-size: 0.85rem; color: #475569; text-transform: uppercase; }
        pre { background: #f1f5f9; padding: 1rem; border-radius: 8px; overflow-x: auto; margin: 0.5rem 0; }
        .finding { background: #eff6ff; border-left: 4px solid #3b82f6; padding: 1rem 1.25rem; border-radius: 0 8px 8px 0; margin: 1rem 0; }
        .finding.positive { background: #f0fdf4; border-color: #10b981; }
        .finding.neutral { background: #fefce8; border-color: #eab308; }
        @media (max-width: 768px) { .chart-grid { grid-template-columns: 1fr; } body { padding: 1rem; } }
"#;

const REST_LABEL: &str = "REST Waterfall";
const GQL_LABEL: &str = "GraphQL Aggregated";

/// Report errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("no usable benchmark snapshots found, run a suite first")]
    NoInput,
}

/// Snapshots the report is built from; any of them may be missing
#[derive(Clone, Debug, Default)]
pub struct ReportInputs {
    pub rest: Option<Snapshot>,
    pub graphql: Option<Snapshot>,
    pub comparison: Option<Snapshot>,
    pub cache: Option<Snapshot>,
}

impl ReportInputs {
    /// Read every suite snapshot; unreadable files are logged and skipped
    pub fn load(storage: &ResultsStorage) -> Self {
        let read = |suite: Suite| match storage.load(suite.file_name()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring {}: {:#}", suite.file_name(), e);
                None
            }
        };

        Self {
            rest: read(Suite::RestWaterfall),
            graphql: read(Suite::GraphqlAggregated),
            comparison: read(Suite::Comparison),
            cache: read(Suite::CacheImpact),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_none()
            && self.graphql.is_none()
            && self.comparison.is_none()
            && self.cache.is_none()
    }

    fn present(&self) -> impl Iterator<Item = &Snapshot> {
        [&self.rest, &self.graphql, &self.comparison, &self.cache]
            .into_iter()
            .flatten()
    }
}

struct Section {
    title: &'static str,
    body: String,
    charts: Vec<Chart>,
    /// Methodology is always present and does not count as data
    has_data: bool,
}

/// Assembled report
pub struct Report {
    generated: DateTime<Utc>,
    sources: Vec<(String, DateTime<Utc>)>,
    sections: Vec<Section>,
}

impl Report {
    pub fn section_titles(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.title).collect()
    }

    /// Sections and chart scripts; depends only on snapshot numbers
    pub fn render_body(&self) -> String {
        let mut out = String::new();

        for (i, section) in self.sections.iter().enumerate() {
            let _ = writeln!(out, "    <h2>{}. {}</h2>", i + 1, section.title);
            if !section.charts.is_empty() {
                out.push_str("    <div class=\"chart-grid\">\n");
                for chart in &section.charts {
                    let _ = writeln!(
                        out,
                        "        <div class=\"chart-container\"><div class=\"chart-title\">{}</div><canvas id=\"{}\"></canvas></div>",
                        escape(&chart.title),
                        chart.id
                    );
                }
                out.push_str("    </div>\n");
            }
            out.push_str(&section.body);
        }

        out.push_str("<script>\n");
        for chart in self.sections.iter().flat_map(|s| &s.charts) {
            let _ = writeln!(out, "    {}", chart.render_script());
        }
        out.push_str("</script>\n");
        out
    }

    /// Complete self-contained document
    pub fn render_html(&self) -> String {
        let mut stamps = format!("Generated: {} UTC", self.generated.format("%Y-%m-%d %H:%M:%S"));
        for (label, timestamp) in &self.sources {
            let _ = write!(stamps, " | {}: {}", escape(label), timestamp.to_rfc3339());
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Gateway Performance Benchmark Report</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js"></script>
    <style>{STYLE}    </style>
</head>
<body>
<div class="container">
    <h1>Gateway Performance Benchmark Report</h1>
    <p class="subtitle">GraphQL Gateway Aggregation vs REST Waterfall Pattern</p>
    <p class="timestamp">{stamps}</p>
{body}</div>
</body>
</html>
"#,
            body = self.render_body()
        )
    }
}

/// Appends sections in fixed order, skipping those without data
pub struct ReportBuilder<'a> {
    inputs: &'a ReportInputs,
    sections: Vec<Section>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(inputs: &'a ReportInputs) -> Self {
        Self {
            inputs,
            sections: Vec::new(),
        }
    }

    /// Build the report; fails when no section besides methodology has data
    pub fn build(mut self) -> Result<Report, ReportError> {
        self.summary();
        self.latency();
        self.network();
        self.throughput();
        self.cache();
        self.side_by_side();
        self.methodology();

        if !self.sections.iter().any(|s| s.has_data) {
            return Err(ReportError::NoInput);
        }

        Ok(Report {
            generated: Utc::now(),
            sources: self
                .inputs
                .present()
                .map(|s| (s.label.clone(), s.timestamp))
                .collect(),
            sections: self.sections,
        })
    }

    fn push(&mut self, title: &'static str, body: String, charts: Vec<Chart>) {
        self.sections.push(Section {
            title,
            body,
            charts,
            has_data: true,
        });
    }

    fn rest_trend(&self, metric: &str) -> Option<TrendStats> {
        trend(self.inputs.rest.as_ref(), metric)
    }

    fn gql_trend(&self, metric: &str) -> Option<TrendStats> {
        trend(self.inputs.graphql.as_ref(), metric)
    }

    fn summary(&mut self) {
        let rest = self.inputs.rest.as_ref();
        let gql = self.inputs.graphql.as_ref();
        let rest_latency = self.rest_trend(names::REST_WATERFALL_TOTAL);
        let gql_latency = self.gql_trend(names::GRAPHQL_QUERY_TOTAL);
        let rest_payload = self.rest_trend(names::REST_TOTAL_PAYLOAD);
        let gql_payload = self.gql_trend(names::GRAPHQL_PAYLOAD);
        let rest_cpi = calls_per_iteration(rest, names::REST_TOTAL_HTTP_CALLS);
        let gql_cpi = calls_per_iteration(gql, names::GRAPHQL_TOTAL_REQUESTS);

        let mut cards = String::new();
        if let Some(t) = &rest_latency {
            latency_card(&mut cards, "REST Avg Latency", "rest", t);
        }
        if let Some(t) = &gql_latency {
            latency_card(&mut cards, "GraphQL Avg Latency", "graphql", t);
        }
        if let Some(cpi) = rest_cpi {
            let detail = counter_detail(rest, names::REST_TOTAL_HTTP_CALLS, "Total calls");
            card(&mut cards, "REST HTTP Calls / Iteration", "rest", &fmt_value(Some(cpi), 1), &detail);
        }
        if let Some(cpi) = gql_cpi {
            let detail = counter_detail(gql, names::GRAPHQL_TOTAL_REQUESTS, "Total requests");
            card(&mut cards, "GraphQL HTTP Calls / Iteration", "graphql", &fmt_value(Some(cpi), 1), &detail);
        }
        if let (Some(r), Some(g)) = (&rest_latency, &gql_latency) {
            card(
                &mut cards,
                "Avg Latency Improvement",
                "improvement",
                &pct_change(Some(r.avg), Some(g.avg)),
                "GraphQL gateway aggregation vs REST waterfall",
            );
        }
        if let (Some(r), Some(g)) = (&rest_payload, &gql_payload) {
            card(
                &mut cards,
                "Avg Payload Size",
                "improvement",
                &pct_change(Some(r.avg), Some(g.avg)),
                &format!("REST: {}B vs GraphQL: {}B", ms0(r.avg), ms0(g.avg)),
            );
        }

        let mut findings = String::new();
        if let (Some(r), Some(g)) = (&rest_latency, &gql_latency) {
            let text = if g.avg < r.avg {
                format!(
                    "GraphQL is <strong>{}</strong> faster on average thanks to parallel scatter-gather inside the gateway.",
                    pct_change(Some(r.avg), Some(g.avg))
                )
            } else {
                "The gateway adds per-request overhead but replaces several client round trips with one, which pays off on high-latency networks.".to_string()
            };
            finding(
                &mut findings,
                if g.avg < r.avg { "positive" } else { "neutral" },
                &format!(
                    "<strong>Latency:</strong> GraphQL gateway averages <strong>{}ms</strong> vs REST waterfall at <strong>{}ms</strong>. {}",
                    ms2(g.avg),
                    ms2(r.avg),
                    text
                ),
            );
        }
        if let Some(cpi) = rest_cpi {
            let gql_clause = match gql_cpi {
                Some(g) => format!(" while GraphQL needs <strong>{}</strong>", fmt_value(Some(g), 1)),
                None => String::new(),
            };
            finding(
                &mut findings,
                "positive",
                &format!(
                    "<strong>Network Efficiency:</strong> REST needs <strong>{}</strong> sequential HTTP round trips per iteration{}.",
                    fmt_value(Some(cpi), 1),
                    gql_clause
                ),
            );
        }
        if let (Some(r), Some(g)) = (&rest_payload, &gql_payload) {
            finding(
                &mut findings,
                if g.avg < r.avg { "positive" } else { "neutral" },
                &format!(
                    "<strong>Payload Size:</strong> REST transfers an average of <strong>{} bytes</strong> vs GraphQL at <strong>{} bytes</strong>.",
                    ms0(r.avg),
                    ms0(g.avg)
                ),
            );
        }

        if cards.is_empty() && findings.is_empty() {
            return;
        }

        let mut body = String::new();
        if !cards.is_empty() {
            let _ = writeln!(body, "    <div class=\"summary-grid\">{cards}\n    </div>");
        }
        if !findings.is_empty() {
            let _ = writeln!(body, "    <h3>Key Findings</h3>{findings}");
        }
        self.push("Executive Summary", body, Vec::new());
    }

    fn latency(&mut self) {
        let rest_latency = self.rest_trend(names::REST_WATERFALL_TOTAL);
        let gql_latency = self.gql_trend(names::GRAPHQL_QUERY_TOTAL);

        let rows: Vec<(String, Option<TrendStats>)> = vec![
            (
                format!("<strong class=\"val-rest\">{REST_LABEL} (total)</strong>"),
                rest_latency.clone(),
            ),
            (
                format!("<strong class=\"val-gql\">{GQL_LABEL}</strong>"),
                gql_latency.clone(),
            ),
            (
                "&nbsp;&nbsp;REST: GET /users/:id".to_string(),
                self.rest_trend(names::REST_USER_CALL),
            ),
            (
                "&nbsp;&nbsp;REST: GET /orders/user/:id".to_string(),
                self.rest_trend(names::REST_ORDERS_CALL),
            ),
            (
                "&nbsp;&nbsp;REST: GET /products/:id (scatter)".to_string(),
                self.rest_trend(names::REST_PRODUCTS_SCATTER),
            ),
            (
                "&nbsp;&nbsp;REST: GET /payments/order/:id".to_string(),
                self.rest_trend(names::REST_PAYMENT_CALL),
            ),
        ];

        let Some(table) = trend_table("Metric", &rows) else {
            return;
        };

        let sides = [(REST_LABEL, rest_latency, chart::REST), (GQL_LABEL, gql_latency, chart::GRAPHQL)];
        let mut charts = Vec::new();
        let averages: Vec<Dataset> = sides
            .iter()
            .filter_map(|(label, t, palette)| {
                t.as_ref()
                    .map(|t| Dataset::new(*label, vec![t.avg, t.med, t.min, t.max], *palette))
            })
            .collect();
        if !averages.is_empty() {
            charts.push(Chart::new(
                "latencyAvgChart",
                "Average Latency Comparison (ms)",
                ChartKind::Bar,
                &["Average", "Median", "Min", "Max"],
                averages,
                Some("Milliseconds"),
            ));
            let percentiles = sides
                .iter()
                .filter_map(|(label, t, palette)| {
                    t.as_ref().map(|t| Dataset::new(*label, distribution(t), *palette).area())
                })
                .collect();
            charts.push(Chart::new(
                "latencyPercentilesChart",
                "Latency Percentiles (ms)",
                ChartKind::Line,
                &["Min", "p50 (Median)", "p90", "p95", "Max"],
                percentiles,
                Some("Milliseconds"),
            ));
        }

        let body = format!("    <h3>Detailed Latency Metrics</h3>\n{table}");
        self.push("Latency Analysis", body, charts);
    }

    fn network(&mut self) {
        let rest = self.inputs.rest.as_ref();
        let gql = self.inputs.graphql.as_ref();
        let rest_cpi = calls_per_iteration(rest, names::REST_TOTAL_HTTP_CALLS);
        let gql_cpi = calls_per_iteration(gql, names::GRAPHQL_TOTAL_REQUESTS);
        let rest_payload = self.rest_trend(names::REST_TOTAL_PAYLOAD);
        let gql_payload = self.gql_trend(names::GRAPHQL_PAYLOAD);

        let mut rows = String::new();
        if rest_cpi.is_some() || gql_cpi.is_some() {
            compare_row(&mut rows, "HTTP calls / iteration", rest_cpi, gql_cpi, 1, "");
        }
        let (rest_avg, gql_avg) = (
            rest_payload.as_ref().map(|t| t.avg),
            gql_payload.as_ref().map(|t| t.avg),
        );
        if rest_avg.is_some() || gql_avg.is_some() {
            compare_row(&mut rows, "Avg payload size", rest_avg, gql_avg, 0, " B");
        }
        if rows.is_empty() {
            return;
        }

        let mut charts = Vec::new();
        let calls: Vec<Dataset> = [(REST_LABEL, rest_cpi, chart::REST), (GQL_LABEL, gql_cpi, chart::GRAPHQL)]
            .into_iter()
            .filter_map(|(label, v, palette)| v.map(|v| Dataset::new(label, vec![v], palette)))
            .collect();
        if !calls.is_empty() {
            charts.push(Chart::new(
                "httpCallsChart",
                "HTTP Round Trips per Iteration",
                ChartKind::Bar,
                &["Calls per iteration"],
                calls,
                Some("Calls"),
            ));
        }
        let payloads: Vec<Dataset> = [(REST_LABEL, &rest_payload, chart::REST), (GQL_LABEL, &gql_payload, chart::GRAPHQL)]
            .into_iter()
            .filter_map(|(label, t, palette)| {
                t.as_ref()
                    .map(|t| Dataset::new(label, vec![t.avg, t.min, t.max], palette))
            })
            .collect();
        if !payloads.is_empty() {
            charts.push(Chart::new(
                "payloadChart",
                "Payload Size (bytes)",
                ChartKind::Bar,
                &["Average", "Min", "Max"],
                payloads,
                Some("Bytes"),
            ));
        }

        self.push("Network Efficiency", comparison_table(&rows), charts);
    }

    fn throughput(&mut self) {
        let stat = |s: &Option<Snapshot>, name: &str| s.as_ref().and_then(|s| s.stat(HTTP_REQS, name));
        let (rest_rate, gql_rate) = (stat(&self.inputs.rest, "rate"), stat(&self.inputs.graphql, "rate"));
        let (rest_count, gql_count) = (stat(&self.inputs.rest, "count"), stat(&self.inputs.graphql, "count"));

        if rest_rate.is_none() && gql_rate.is_none() && rest_count.is_none() && gql_count.is_none() {
            return;
        }

        // higher is better here, so no improvement column
        let mut rows = String::new();
        for (label, rest, gql, decimals) in [
            ("HTTP requests per second", rest_rate, gql_rate, 2),
            ("Total HTTP requests", rest_count, gql_count, 0),
        ] {
            let _ = writeln!(
                rows,
                "            <tr><td>{label}</td><td class=\"val-rest\">{}</td><td class=\"val-gql\">{}</td><td>-</td></tr>",
                fmt_value(rest, decimals),
                fmt_value(gql, decimals)
            );
        }

        let series = |rest: Option<f64>, gql: Option<f64>| -> Vec<Dataset> {
            [(REST_LABEL, rest, chart::REST), (GQL_LABEL, gql, chart::GRAPHQL)]
                .into_iter()
                .filter_map(|(label, v, palette)| v.map(|v| Dataset::new(label, vec![v], palette)))
                .collect()
        };
        let mut charts = Vec::new();
        let rates = series(rest_rate, gql_rate);
        if !rates.is_empty() {
            charts.push(Chart::new(
                "throughputChart",
                "Requests per Second",
                ChartKind::Bar,
                &["Requests per second"],
                rates,
                Some("req/s"),
            ));
        }
        let counts = series(rest_count, gql_count);
        if !counts.is_empty() {
            charts.push(Chart::new(
                "totalRequestsChart",
                "Total Requests Completed",
                ChartKind::Bar,
                &["Total requests"],
                counts,
                None,
            ));
        }

        self.push("Throughput Analysis", comparison_table(&rows), charts);
    }

    fn cache(&mut self) {
        let Some(cache) = self.inputs.cache.as_ref() else {
            return;
        };
        let phases = [
            ("Cold Cache", "val-rest", trend(Some(cache), names::COLD_CACHE_DURATION), chart::COLD),
            ("Warm Cache", "val-gql", trend(Some(cache), names::WARM_CACHE_DURATION), chart::WARM),
            ("Mixed Workload", "", trend(Some(cache), names::MIXED_CACHE_DURATION), chart::MIXED),
        ];

        let rows: Vec<(String, Option<TrendStats>)> = phases
            .iter()
            .map(|(label, class, t, _)| (format!("<strong class=\"{class}\">{label}</strong>"), t.clone()))
            .collect();
        let Some(table) = trend_table("Phase", &rows) else {
            return;
        };

        let curves: Vec<Dataset> = phases
            .iter()
            .filter_map(|(label, _, t, palette)| {
                t.as_ref().map(|t| Dataset::new(*label, distribution(t), *palette).area())
            })
            .collect();
        let bars: Vec<Dataset> = phases
            .iter()
            .filter_map(|(label, _, t, palette)| {
                t.as_ref()
                    .map(|t| Dataset::new(*label, vec![t.avg, t.med, t.p95], *palette))
            })
            .collect();
        let charts = vec![
            Chart::new(
                "cacheChart",
                "Cold vs Warm Cache Latency (ms)",
                ChartKind::Line,
                &["Min", "p50", "p90", "p95", "Max"],
                curves,
                Some("Milliseconds"),
            ),
            Chart::new(
                "cacheBarChart",
                "Cache Performance Summary",
                ChartKind::Bar,
                &["Average", "Median", "p95"],
                bars,
                Some("Milliseconds"),
            ),
        ];

        let mut body = table;
        if let (Some(cold), Some(warm)) = (&phases[0].2, &phases[1].2) {
            finding(
                &mut body,
                "positive",
                &format!(
                    "<strong>Cache Improvement:</strong> average response time went from <strong>{}ms</strong> (cold) to <strong>{}ms</strong> (warm), a <strong>{}</strong> change.",
                    ms2(cold.avg),
                    ms2(warm.avg),
                    pct_change(Some(cold.avg), Some(warm.avg))
                ),
            );
            body.push('\n');
        }
        let requests = cache.stat(names::CACHE_TOTAL_REQUESTS, "count");
        let errors = cache.stat(names::CACHE_TEST_ERRORS, "rate");
        if requests.is_some() || errors.is_some() {
            let _ = writeln!(
                body,
                "    <p>Gateway requests: <strong>{}</strong> | Error rate: <strong>{}%</strong></p>",
                fmt_value(requests, 0),
                fmt_value(errors.map(|r| r * 100.0), 2)
            );
        }

        self.push("Cache Impact", body, charts);
    }

    fn side_by_side(&mut self) {
        let Some(cmp) = self.inputs.comparison.as_ref() else {
            return;
        };
        let rest = trend(Some(cmp), names::CMP_REST_DURATION);
        let gql = trend(Some(cmp), names::CMP_GQL_DURATION);

        let mut rows = String::new();
        if let (Some(r), Some(g)) = (&rest, &gql) {
            compare_row(&mut rows, "Avg latency", Some(r.avg), Some(g.avg), 2, " ms");
            compare_row(&mut rows, "p95 latency", Some(r.p95), Some(g.p95), 2, " ms");
        }
        let payload = |name| cmp.stat(name, "avg");
        if let (Some(r), Some(g)) = (payload(names::CMP_REST_PAYLOAD), payload(names::CMP_GQL_PAYLOAD)) {
            compare_row(&mut rows, "Avg payload size", Some(r), Some(g), 0, " B");
        }
        let calls = |name| cmp.stat(name, "count");
        if let (Some(r), Some(g)) = (calls(names::CMP_REST_CALLS), calls(names::CMP_GQL_CALLS)) {
            compare_row(&mut rows, "Total HTTP calls", Some(r), Some(g), 0, "");
        }
        let error_rate = |name| cmp.stat(name, "rate").map(|r| r * 100.0);
        if let (Some(r), Some(g)) = (error_rate(names::CMP_REST_ERRORS), error_rate(names::CMP_GQL_ERRORS)) {
            let _ = writeln!(
                rows,
                "            <tr><td>Error rate</td><td class=\"val-rest\">{}%</td><td class=\"val-gql\">{}%</td><td>-</td></tr>",
                ms2(r),
                ms2(g)
            );
        }
        if rows.is_empty() {
            return;
        }

        let mut charts = Vec::new();
        if let (Some(r), Some(g)) = (&rest, &gql) {
            charts.push(Chart::new(
                "comparisonChart",
                "REST vs GraphQL Under Identical Load",
                ChartKind::Bar,
                &["Average (ms)", "Median (ms)", "p95 (ms)", "Max (ms)"],
                vec![
                    Dataset::new(REST_LABEL, vec![r.avg, r.med, r.p95, r.max], chart::REST),
                    Dataset::new(GQL_LABEL, vec![g.avg, g.med, g.p95, g.max], chart::GRAPHQL),
                ],
                Some("Milliseconds"),
            ));
        }

        self.push("Side-by-Side Comparison", comparison_table(&rows), charts);
    }

    fn methodology(&mut self) {
        let mut body = String::from("    <div class=\"card\">\n        <h3>Load Scenarios</h3>\n");
        for suite in Suite::ALL {
            let _ = writeln!(body, "        <p><strong>{}</strong></p>\n        <ul>", suite.label());
            for line in suite.load_profile() {
                let _ = writeln!(body, "            <li>{}</li>", escape(&line));
            }
            body.push_str("        </ul>\n");
        }
        body.push_str(
            r#"        <h3>REST Waterfall Pattern (Control)</h3>
        <p>Sequential HTTP calls from the client to each service; later calls depend on earlier results.</p>
        <pre>
GET /users/{id}              → user service     (1 call)
GET /orders/user/{id}        → order service    (1 call)
GET /products/{pid}          → product service  (1 call per product)
GET /payments/order/{oid}    → payment service  (1 call per order)</pre>
        <h3>GraphQL Gateway Pattern (Treatment)</h3>
        <p>A single query; the gateway resolves users, orders, products and payments internally.</p>
        <pre>
POST /graphql { user(id) { orders { products payment } } }
                             → 1 HTTP round trip</pre>
        <h3>Statistics</h3>
        <p>Percentiles interpolate linearly between the two closest ranks of the sorted sample. Calls per iteration divide the call counter by the completed-iteration counter.</p>
    </div>
"#,
        );

        self.sections.push(Section {
            title: "Test Methodology",
            body,
            charts: Vec::new(),
            has_data: false,
        });
    }
}

/// Load snapshots from `storage`, render the report and write it next to them
pub fn generate_report(storage: &ResultsStorage) -> Result<PathBuf> {
    let inputs = ReportInputs::load(storage);
    if inputs.is_empty() {
        return Err(ReportError::NoInput.into());
    }

    let report = ReportBuilder::new(&inputs).build()?;
    info!("Report sections: {}", report.section_titles().join(", "));
    storage.write_report(&report.render_html())
}

fn trend(snapshot: Option<&Snapshot>, metric: &str) -> Option<TrendStats> {
    snapshot
        .and_then(|s| s.metric(metric))
        .and_then(MetricSummary::trend)
}

fn calls_per_iteration(snapshot: Option<&Snapshot>, calls: &str) -> Option<f64> {
    let s = snapshot?;
    ratio(s.stat(calls, "count"), s.stat(ITERATIONS, "count"))
}

fn distribution(t: &TrendStats) -> Vec<f64> {
    vec![t.min, t.med, t.p90, t.p95, t.max]
}

fn ms2(v: f64) -> String {
    fmt_value(Some(v), 2)
}

fn ms0(v: f64) -> String {
    fmt_value(Some(v), 0)
}

fn counter_detail(snapshot: Option<&Snapshot>, metric: &str, label: &str) -> String {
    let stat = |name| snapshot.and_then(|s| s.stat(metric, name));
    format!(
        "{label}: {} | Rate: {}/s",
        fmt_value(stat("count"), 0),
        fmt_value(stat("rate"), 2)
    )
}

fn card(out: &mut String, label: &str, class: &str, value: &str, detail: &str) {
    let _ = write!(
        out,
        r#"
        <div class="card">
            <div class="card-label">{label}</div>
            <div class="card-value {class}">{value}</div>
            <div class="card-detail">{detail}</div>
        </div>"#
    );
}

fn latency_card(out: &mut String, label: &str, class: &str, t: &TrendStats) {
    card(
        out,
        label,
        class,
        &format!("{} ms", ms2(t.avg)),
        &format!("p95: {} ms | max: {} ms", ms2(t.p95), ms2(t.max)),
    );
}

fn finding(out: &mut String, class: &str, html: &str) {
    let _ = write!(out, "\n    <div class=\"finding {class}\">{html}</div>");
}

/// Min/avg/med/p90/p95/max table; `None` when no row has a distribution
fn trend_table(first: &str, rows: &[(String, Option<TrendStats>)]) -> Option<String> {
    let mut body = String::new();
    for (label, t) in rows {
        if let Some(t) = t {
            let _ = writeln!(
                body,
                "            <tr><td>{label}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                ms2(t.min),
                ms2(t.avg),
                ms2(t.med),
                ms2(t.p90),
                ms2(t.p95),
                ms2(t.max)
            );
        }
    }
    if body.is_empty() {
        return None;
    }

    Some(format!(
        "    <div class=\"card\">\n    <table>\n        <thead><tr><th>{first}</th><th>Min</th><th>Avg</th><th>Median</th><th>p90</th><th>p95</th><th>Max</th></tr></thead>\n        <tbody>\n{body}        </tbody>\n    </table>\n    </div>\n"
    ))
}

fn compare_row(out: &mut String, label: &str, rest: Option<f64>, gql: Option<f64>, decimals: usize, unit: &str) {
    let cell = |v: Option<f64>| match v {
        Some(_) => format!("{}{unit}", fmt_value(v, decimals)),
        None => fmt_value(None, decimals),
    };
    let _ = writeln!(
        out,
        "            <tr><td>{label}</td><td class=\"val-rest\">{}</td><td class=\"val-gql\">{}</td><td class=\"val-good\">{}</td></tr>",
        cell(rest),
        cell(gql),
        pct_change(rest, gql)
    );
}

fn comparison_table(rows: &str) -> String {
    format!(
        "    <div class=\"card\">\n    <table>\n        <thead><tr><th>Metric</th><th class=\"val-rest\">REST</th><th class=\"val-gql\">GraphQL</th><th>Improvement</th></tr></thead>\n        <tbody>\n{rows}        </tbody>\n    </table>\n    </div>\n"
    )
}

/// Minimal HTML escaping for text nodes
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
