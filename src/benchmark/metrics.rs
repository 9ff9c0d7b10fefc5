//! Metric sink
//!
//! A run-scoped registry of named Counter, Trend and Rate metrics. Workloads
//! append tagged observations concurrently; statistics are derived on demand
//! from everything recorded so far.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Tags attached to a single observation
pub type Tags = BTreeMap<String, String>;

/// Build a tag set from string pairs
pub fn tags<const N: usize>(pairs: [(&str, &str); N]) -> Tags {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Duration of every HTTP call, in milliseconds
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
/// Number of HTTP calls issued
pub const HTTP_REQS: &str = "http_reqs";
/// Number of completed workload iterations
pub const ITERATIONS: &str = "iterations";
/// Wall-clock duration of each iteration, in milliseconds
pub const ITERATION_DURATION: &str = "iteration_duration";

/// Metric errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("metric '{name}' is already registered as {existing}, cannot redefine as {requested}")]
    KindConflict {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
}

/// Kind of metric, fixed at registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// Running sum of added values
    Counter,
    /// Distribution of sampled values
    Trend,
    /// Fraction of non-zero observations
    Rate,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Trend => "trend",
            MetricKind::Rate => "rate",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
struct Observation {
    value: f64,
    tags: Tags,
}

struct MetricSeries {
    name: String,
    kind: MetricKind,
    observations: Mutex<Vec<Observation>>,
}

impl MetricSeries {
    fn lock(&self) -> MutexGuard<'_, Vec<Observation>> {
        // A panicking writer cannot leave a half-pushed Vec behind
        self.observations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cheap, cloneable reference to a registered metric
#[derive(Clone)]
pub struct MetricHandle {
    series: Arc<MetricSeries>,
}

impl MetricHandle {
    pub fn name(&self) -> &str {
        &self.series.name
    }

    pub fn kind(&self) -> MetricKind {
        self.series.kind
    }

    /// Append one observation
    pub fn add(&self, value: f64, tags: &Tags) {
        self.series.lock().push(Observation {
            value,
            tags: tags.clone(),
        });
    }

    /// Append a boolean observation (Rate metrics)
    pub fn add_bool(&self, value: bool, tags: &Tags) {
        self.add(if value { 1.0 } else { 0.0 }, tags);
    }

    /// Number of observations recorded so far
    pub fn len(&self) -> usize {
        self.series.lock().len()
    }

    fn values_where(&self, filter: Option<(&str, &str)>) -> Vec<f64> {
        let observations = self.series.lock();
        match filter {
            None => observations.iter().map(|o| o.value).collect(),
            Some((key, value)) => observations
                .iter()
                .filter(|o| o.tags.get(key).map(String::as_str) == Some(value))
                .map(|o| o.value)
                .collect(),
        }
    }
}

impl fmt::Debug for MetricHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricHandle")
            .field("name", &self.series.name)
            .field("kind", &self.series.kind)
            .finish()
    }
}

/// Trend statistics (values in the metric's unit, usually milliseconds)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendStats {
    pub min: f64,
    pub avg: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: f64,
    pub count: usize,
}

impl TrendStats {
    /// Calculate statistics from samples; `None` when there are none
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sum: f64 = sorted.iter().sum();

        Some(Self {
            min: sorted[0],
            avg: sum / sorted.len() as f64,
            med: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
            max: sorted[sorted.len() - 1],
            count: sorted.len(),
        })
    }

    /// Format as summary string
    pub fn format_summary(&self) -> String {
        format!(
            "avg={:.2} min={:.2} med={:.2} max={:.2} p(90)={:.2} p(95)={:.2}",
            self.avg, self.min, self.med, self.max, self.p90, self.p95
        )
    }
}

/// Percentile of a sorted sample, interpolating linearly between the two
/// closest ranks. Every Trend uses this so results stay comparable.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let idx = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let fraction = idx - lower as f64;

    if upper >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

/// Counter statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterStats {
    /// Sum of all added values
    pub count: f64,
    /// Sum per second of run time
    pub rate: f64,
}

impl CounterStats {
    pub fn new(values: &[f64], elapsed: Duration) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count: f64 = values.iter().sum();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { count / secs } else { 0.0 };
        Some(Self { count, rate })
    }
}

/// Rate statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    /// Fraction of observations that were true (0.0 - 1.0)
    pub rate: f64,
    pub passes: u64,
    pub fails: u64,
}

impl RateStats {
    pub fn new(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let passes = values.iter().filter(|v| **v != 0.0).count() as u64;
        let fails = values.len() as u64 - passes;
        Some(Self {
            rate: passes as f64 / values.len() as f64,
            passes,
            fails,
        })
    }

    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

/// Derived statistics of one metric
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MetricStats {
    Trend(TrendStats),
    Counter(CounterStats),
    Rate(RateStats),
}

impl MetricStats {
    fn derive(kind: MetricKind, values: &[f64], elapsed: Duration) -> Option<Self> {
        match kind {
            MetricKind::Trend => TrendStats::from_samples(values).map(MetricStats::Trend),
            MetricKind::Counter => CounterStats::new(values, elapsed).map(MetricStats::Counter),
            MetricKind::Rate => RateStats::new(values).map(MetricStats::Rate),
        }
    }

    pub fn as_trend(&self) -> Option<&TrendStats> {
        match self {
            MetricStats::Trend(t) => Some(t),
            _ => None,
        }
    }
}

/// All metric statistics captured at a single instant
#[derive(Clone, Debug, Default)]
pub struct FrozenMetrics {
    pub elapsed: Duration,
    pub stats: BTreeMap<String, MetricStats>,
}

impl FrozenMetrics {
    pub fn get(&self, name: &str) -> Option<&MetricStats> {
        self.stats.get(name)
    }
}

/// Handles for the metrics every run records
#[derive(Clone, Debug)]
pub struct BuiltinMetrics {
    pub http_req_duration: MetricHandle,
    pub http_reqs: MetricHandle,
    pub iterations: MetricHandle,
    pub iteration_duration: MetricHandle,
}

/// Run-scoped metric registry
pub struct MetricRegistry {
    started: Instant,
    series: Mutex<BTreeMap<String, MetricHandle>>,
    builtins: BuiltinMetrics,
}

impl MetricRegistry {
    /// Create a registry with the built-in metrics already registered
    pub fn new() -> Self {
        let mut series = BTreeMap::new();
        let mut builtin = |name: &str, kind: MetricKind| {
            let handle = MetricHandle {
                series: Arc::new(MetricSeries {
                    name: name.to_string(),
                    kind,
                    observations: Mutex::new(Vec::new()),
                }),
            };
            series.insert(name.to_string(), handle.clone());
            handle
        };

        let builtins = BuiltinMetrics {
            http_req_duration: builtin(HTTP_REQ_DURATION, MetricKind::Trend),
            http_reqs: builtin(HTTP_REQS, MetricKind::Counter),
            iterations: builtin(ITERATIONS, MetricKind::Counter),
            iteration_duration: builtin(ITERATION_DURATION, MetricKind::Trend),
        };

        Self {
            started: Instant::now(),
            series: Mutex::new(series),
            builtins,
        }
    }

    /// Register a metric, or return the existing handle when the name is
    /// already registered with the same kind
    pub fn register(&self, name: &str, kind: MetricKind) -> Result<MetricHandle, MetricError> {
        let mut series = self
            .series
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = series.get(name) {
            if existing.kind() != kind {
                return Err(MetricError::KindConflict {
                    name: name.to_string(),
                    existing: existing.kind(),
                    requested: kind,
                });
            }
            return Ok(existing.clone());
        }

        let handle = MetricHandle {
            series: Arc::new(MetricSeries {
                name: name.to_string(),
                kind,
                observations: Mutex::new(Vec::new()),
            }),
        };
        series.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub fn counter(&self, name: &str) -> Result<MetricHandle, MetricError> {
        self.register(name, MetricKind::Counter)
    }

    pub fn trend(&self, name: &str) -> Result<MetricHandle, MetricError> {
        self.register(name, MetricKind::Trend)
    }

    pub fn rate(&self, name: &str) -> Result<MetricHandle, MetricError> {
        self.register(name, MetricKind::Rate)
    }

    /// Look up a registered metric by name
    pub fn get(&self, name: &str) -> Option<MetricHandle> {
        self.series
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    pub fn builtins(&self) -> &BuiltinMetrics {
        &self.builtins
    }

    /// Record one observation
    pub fn observe(&self, handle: &MetricHandle, value: f64, tags: &Tags) {
        handle.add(value, tags);
    }

    /// Time since the registry was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Statistics over everything recorded so far; `None` if nothing was
    pub fn snapshot(&self, handle: &MetricHandle) -> Option<MetricStats> {
        let values = handle.values_where(None);
        MetricStats::derive(handle.kind(), &values, self.elapsed())
    }

    /// Statistics over observations carrying `tag=value`
    pub fn stats_where(&self, handle: &MetricHandle, tag: &str, value: &str) -> Option<MetricStats> {
        let values = handle.values_where(Some((tag, value)));
        MetricStats::derive(handle.kind(), &values, self.elapsed())
    }

    /// Capture statistics of every metric that has observations
    pub fn freeze(&self) -> FrozenMetrics {
        let elapsed = self.elapsed();
        let handles: Vec<MetricHandle> = self
            .series
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();

        let stats = handles
            .iter()
            .filter_map(|h| {
                let values = h.values_where(None);
                MetricStats::derive(h.kind(), &values, elapsed).map(|s| (h.name().to_string(), s))
            })
            .collect();

        FrozenMetrics { elapsed, stats }
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
