//! Workload functions
//!
//! A [`Workload`] models one logical user action. Each call to
//! [`Workload::iterate`] performs that action once against the services under
//! test, records its outcome into the metric registry and reports a
//! [`WorkloadResult`] back to the scheduler. Failures are recorded, never
//! propagated: one bad iteration cannot stop a phase.

pub mod aggregated;
pub mod cache;
pub mod graphql;
pub mod names;
pub mod waterfall;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::benchmark::{MetricHandle, MetricRegistry, Tags};
use crate::http::{HttpRequest, Transport};
use crate::utils::Timer;

pub use aggregated::{AggregatedQuery, GraphqlMetrics};
pub use cache::{CacheMetrics, CachePhase, CacheProbe};
pub use graphql::{GraphqlExecutor, GraphqlQuery};
pub use waterfall::{RestWaterfall, WaterfallMetrics};

/// Why a call was counted as failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, timeout or other transport error
    Transport,
    /// Non-2xx response
    Status(u16),
    /// 2xx response whose body carries a non-empty `errors` array
    Protocol,
    /// Body that could not be parsed
    Malformed,
}

impl FailureKind {
    /// Value of the `kind` tag on failed observations
    pub fn tag_value(&self) -> String {
        match self {
            FailureKind::Transport => "transport".to_string(),
            FailureKind::Status(code) => format!("status_{code}"),
            FailureKind::Protocol => "protocol".to_string(),
            FailureKind::Malformed => "malformed".to_string(),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport failure"),
            FailureKind::Status(code) => write!(f, "HTTP {code}"),
            FailureKind::Protocol => write!(f, "errors in response body"),
            FailureKind::Malformed => write!(f, "malformed response body"),
        }
    }
}

/// Per-iteration context handed out by the scheduler
#[derive(Clone, Debug)]
pub struct IterationContext {
    /// Actor index within the phase
    pub actor: usize,
    /// Zero-based iteration number of this actor
    pub iteration: u64,
    /// Tags identifying the scenario and phase
    pub tags: Tags,
}

impl IterationContext {
    pub fn new(actor: usize, iteration: u64, tags: Tags) -> Self {
        Self {
            actor,
            iteration,
            tags,
        }
    }

    /// Phase tags plus a `call` tag
    pub fn call_tags(&self, call: &str) -> Tags {
        let mut tags = self.tags.clone();
        tags.insert("call".to_string(), call.to_string());
        tags
    }
}

/// Outcome of one iteration, folded into metrics and then dropped
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkloadResult {
    pub duration_ms: f64,
    pub payload_bytes: usize,
    /// Downstream HTTP calls issued
    pub calls: u32,
    /// First failure seen, if any
    pub failure: Option<FailureKind>,
}

impl WorkloadResult {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// One logical user action
#[async_trait]
pub trait Workload: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Run the action once
    async fn iterate(&self, ctx: &IterationContext) -> WorkloadResult;
}

/// Result of a single recorded HTTP call
#[derive(Clone, Debug)]
pub struct CallOutcome {
    pub duration_ms: f64,
    pub payload_bytes: usize,
    /// Response body, empty on transport failure
    pub body: String,
    pub failure: Option<FailureKind>,
}

impl CallOutcome {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Sends requests and records every call into the built-in HTTP metrics
#[derive(Clone)]
pub struct CallRecorder {
    transport: Arc<dyn Transport>,
    http_req_duration: MetricHandle,
    http_reqs: MetricHandle,
}

impl CallRecorder {
    pub fn new(transport: Arc<dyn Transport>, registry: &MetricRegistry) -> Self {
        let builtins = registry.builtins();
        Self {
            transport,
            http_req_duration: builtins.http_req_duration.clone(),
            http_reqs: builtins.http_reqs.clone(),
        }
    }

    /// Send one request; transport and status failures are classified here
    pub async fn send(&self, request: HttpRequest, tags: &Tags) -> CallOutcome {
        let url = request.url.clone();
        let timer = Timer::start("http_call");
        let result = self.transport.send(request).await;
        let duration_ms = timer.stop();

        self.http_req_duration.add(duration_ms, tags);
        self.http_reqs.add(1.0, tags);

        match result {
            Ok(response) => {
                let failure = if response.is_success() {
                    None
                } else {
                    debug!("{} returned HTTP {}", url, response.status_code);
                    Some(FailureKind::Status(response.status_code))
                };
                CallOutcome {
                    duration_ms,
                    payload_bytes: response.payload_len(),
                    body: response.body,
                    failure,
                }
            }
            Err(e) => {
                debug!("{} failed: {}", url, e);
                CallOutcome {
                    duration_ms,
                    payload_bytes: 0,
                    body: String::new(),
                    failure: Some(FailureKind::Transport),
                }
            }
        }
    }
}

/// Record a pass/fail observation, tagging failures with their kind
pub(crate) fn record_outcome(rate: &MetricHandle, failure: Option<FailureKind>, tags: &Tags) {
    match failure {
        Some(kind) => {
            let mut tags = tags.clone();
            tags.insert("kind".to_string(), kind.tag_value());
            rate.add_bool(true, &tags);
        }
        None => rate.add_bool(false, tags),
    }
}

/// Pick a random candidate user id
pub(crate) fn pick_user(user_ids: &[u64]) -> u64 {
    user_ids.choose(&mut rand::rng()).copied().unwrap_or(1)
}
