//! Benchmark suites
//!
//! Each suite is a fixed plan of phases plus the metrics its snapshot keeps
//! and the thresholds that decide the exit status.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::metrics::{MetricRegistry, HTTP_REQS, HTTP_REQ_DURATION, ITERATIONS};
use super::runner::{ExecutorSpec, Phase, PhaseReport, Scheduler, Stage};
use super::thresholds::{evaluate, Threshold, ThresholdError, Verdict};
use crate::config::AppConfig;
use crate::http::Transport;
use crate::results::{ResultsStorage, Snapshot};
use crate::workload::names;
use crate::workload::{
    AggregatedQuery, CacheMetrics, CachePhase, CacheProbe, CallRecorder, GraphqlExecutor,
    GraphqlMetrics, GraphqlQuery, RestWaterfall, WaterfallMetrics, Workload,
};

/// Available suites
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suite {
    RestWaterfall,
    GraphqlAggregated,
    Comparison,
    CacheImpact,
}

impl Suite {
    /// Every suite, in the order `run all` executes them
    pub const ALL: [Suite; 4] = [
        Suite::RestWaterfall,
        Suite::GraphqlAggregated,
        Suite::Comparison,
        Suite::CacheImpact,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rest-waterfall" | "rest" => Some(Suite::RestWaterfall),
            "graphql-aggregated" | "graphql" => Some(Suite::GraphqlAggregated),
            "comparison" | "compare" => Some(Suite::Comparison),
            "cache-impact" | "cache" => Some(Suite::CacheImpact),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Suite::RestWaterfall => "rest-waterfall",
            Suite::GraphqlAggregated => "graphql-aggregated",
            Suite::Comparison => "comparison",
            Suite::CacheImpact => "cache-impact",
        }
    }

    /// Snapshot file inside the results directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Suite::RestWaterfall => "rest-waterfall-summary.json",
            Suite::GraphqlAggregated => "graphql-aggregated-summary.json",
            Suite::Comparison => "comparison-summary.json",
            Suite::CacheImpact => "cache-impact-summary.json",
        }
    }

    /// Snapshot `type` label
    pub fn label(&self) -> &'static str {
        match self {
            Suite::RestWaterfall => "REST Waterfall",
            Suite::GraphqlAggregated => "GraphQL Aggregated",
            Suite::Comparison => "REST vs GraphQL Comparison",
            Suite::CacheImpact => "Cache Impact Analysis",
        }
    }

    /// Metrics kept in the snapshot
    pub fn metrics(&self) -> Vec<&'static str> {
        let own: &[&'static str] = match self {
            Suite::RestWaterfall => &[
                names::REST_WATERFALL_TOTAL,
                names::REST_USER_CALL,
                names::REST_ORDERS_CALL,
                names::REST_PRODUCTS_SCATTER,
                names::REST_PAYMENT_CALL,
                names::REST_TOTAL_PAYLOAD,
                names::REST_HTTP_ERRORS,
                names::REST_TOTAL_HTTP_CALLS,
            ],
            Suite::GraphqlAggregated => &[
                names::GRAPHQL_QUERY_TOTAL,
                names::GRAPHQL_PAYLOAD,
                names::GRAPHQL_ERRORS,
                names::GRAPHQL_TOTAL_REQUESTS,
            ],
            Suite::Comparison => &[
                names::CMP_REST_DURATION,
                names::CMP_REST_PAYLOAD,
                names::CMP_REST_CALLS,
                names::CMP_REST_ERRORS,
                names::CMP_GQL_DURATION,
                names::CMP_GQL_PAYLOAD,
                names::CMP_GQL_CALLS,
                names::CMP_GQL_ERRORS,
            ],
            Suite::CacheImpact => &[
                names::COLD_CACHE_DURATION,
                names::WARM_CACHE_DURATION,
                names::MIXED_CACHE_DURATION,
                names::CACHE_TEST_ERRORS,
                names::CACHE_TOTAL_REQUESTS,
            ],
        };

        own.iter()
            .copied()
            .chain([HTTP_REQ_DURATION, HTTP_REQS, ITERATIONS])
            .collect()
    }

    /// Pass/fail rules checked after the run
    pub fn thresholds(&self) -> Result<Vec<Threshold>, ThresholdError> {
        let rules: &[(&str, &str)] = match self {
            Suite::RestWaterfall => &[
                (HTTP_REQ_DURATION, "p(95)<2000"),
                (names::REST_HTTP_ERRORS, "rate<0.1"),
            ],
            Suite::GraphqlAggregated => &[
                (HTTP_REQ_DURATION, "p(95)<2000"),
                (names::GRAPHQL_ERRORS, "rate<0.1"),
            ],
            Suite::Comparison => &[
                (names::CMP_REST_ERRORS, "rate<0.1"),
                (names::CMP_GQL_ERRORS, "rate<0.1"),
            ],
            Suite::CacheImpact => &[
                (names::CACHE_TEST_ERRORS, "rate<0.15"),
                (names::WARM_CACHE_DURATION, "p(95)<500"),
            ],
        };

        rules
            .iter()
            .map(|(metric, expr)| Threshold::parse(metric, expr))
            .collect()
    }

    /// Phase layout at unit time scale
    pub fn plan(&self) -> Vec<PhasePlan> {
        match self {
            Suite::RestWaterfall => load_stages(Role::Rest),
            Suite::GraphqlAggregated => load_stages(Role::Graphql),
            Suite::Comparison => [("baseline", 10, 0), ("moderate", 50, 35), ("stress", 100, 70)]
                .into_iter()
                .flat_map(|(stage, actors, offset)| {
                    let executor = ExecutorSpec::Fixed {
                        actors,
                        duration: secs(30),
                    };
                    [
                        PhasePlan::new(format!("rest_{stage}"), Role::ComparedRest, executor.clone())
                            .at(secs(offset))
                            .pause(millis(500)),
                        PhasePlan::new(format!("gql_{stage}"), Role::ComparedGraphql, executor)
                            .at(secs(offset))
                            .pause(millis(500)),
                    ]
                })
                .collect(),
            Suite::CacheImpact => vec![
                PhasePlan::new(
                    "cold_cache",
                    Role::Cache(CachePhase::Cold),
                    ExecutorSpec::PerActorIterations {
                        actors: 10,
                        iterations: 3,
                        max_duration: secs(60),
                    },
                )
                .pause(secs(1)),
                PhasePlan::new(
                    "warm_cache",
                    Role::Cache(CachePhase::Warm),
                    ExecutorSpec::Fixed {
                        actors: 30,
                        duration: secs(30),
                    },
                )
                .at(secs(15))
                .pause(millis(300)),
                PhasePlan::new(
                    "warm_stress",
                    Role::Cache(CachePhase::Warm),
                    ExecutorSpec::Fixed {
                        actors: 100,
                        duration: secs(30),
                    },
                )
                .at(secs(50))
                .pause(millis(300)),
                PhasePlan::new(
                    "mixed_workload",
                    Role::Cache(CachePhase::Mixed),
                    ExecutorSpec::Ramping {
                        start_actors: 10,
                        stages: vec![
                            Stage::new(secs(15), 80),
                            Stage::new(secs(15), 80),
                            Stage::new(secs(10), 0),
                        ],
                    },
                )
                .at(secs(85))
                .pause(millis(300)),
            ],
        }
    }

    /// One line per phase, for logs and the report methodology
    pub fn load_profile(&self) -> Vec<String> {
        self.plan()
            .iter()
            .map(|p| {
                format!(
                    "{}: {} for {}s, starting at +{}s",
                    p.name,
                    p.executor.describe_actors(),
                    p.executor.duration().as_secs(),
                    p.start_offset.as_secs()
                )
            })
            .collect()
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Baseline, moderate and stress load followed by a spike
fn load_stages(role: Role) -> Vec<PhasePlan> {
    let fixed = |actors| ExecutorSpec::Fixed {
        actors,
        duration: secs(30),
    };
    vec![
        PhasePlan::new("baseline", role, fixed(10)),
        PhasePlan::new("moderate", role, fixed(50)).at(secs(35)),
        PhasePlan::new("stress", role, fixed(100)).at(secs(70)),
        PhasePlan::new(
            "spike",
            role,
            ExecutorSpec::Ramping {
                start_actors: 0,
                stages: vec![
                    Stage::new(secs(10), 200),
                    Stage::new(secs(20), 200),
                    Stage::new(secs(10), 0),
                ],
            },
        )
        .at(secs(105)),
    ]
    .into_iter()
    .map(|p| p.pause(millis(500)))
    .collect()
}

/// Which workload a phase drives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Rest,
    Graphql,
    ComparedRest,
    ComparedGraphql,
    Cache(CachePhase),
}

impl Role {
    fn approach(&self) -> &'static str {
        match self {
            Role::Rest | Role::ComparedRest => "REST",
            _ => "GraphQL",
        }
    }
}

/// Phase without its workload attached
#[derive(Clone, Debug, PartialEq)]
pub struct PhasePlan {
    pub name: String,
    pub role: Role,
    pub executor: ExecutorSpec,
    pub start_offset: Duration,
    pub pause: Duration,
}

impl PhasePlan {
    fn new(name: impl Into<String>, role: Role, executor: ExecutorSpec) -> Self {
        Self {
            name: name.into(),
            role,
            executor,
            start_offset: Duration::ZERO,
            pause: Duration::ZERO,
        }
    }

    fn at(mut self, offset: Duration) -> Self {
        self.start_offset = offset;
        self
    }

    fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

/// Everything a finished suite produced
#[derive(Debug)]
pub struct SuiteOutcome {
    pub suite: Suite,
    pub snapshot: Snapshot,
    pub phases: Vec<PhaseReport>,
    pub verdicts: Vec<Verdict>,
}

impl SuiteOutcome {
    pub fn breaches(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.outcome.is_breach())
    }
}

/// Runs suites against configured endpoints
pub struct SuiteRunner {
    config: AppConfig,
    transport: Arc<dyn Transport>,
    storage: ResultsStorage,
    query: GraphqlQuery,
    check_thresholds: bool,
}

impl SuiteRunner {
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>) -> Self {
        let storage = ResultsStorage::new(config.results_dir.clone());
        Self {
            config,
            transport,
            storage,
            query: GraphqlQuery::UserDeep,
            check_thresholds: true,
        }
    }

    /// Query sent by the graphql-aggregated suite
    pub fn with_query(mut self, query: GraphqlQuery) -> Self {
        self.query = query;
        self
    }

    pub fn with_thresholds(mut self, enabled: bool) -> Self {
        self.check_thresholds = enabled;
        self
    }

    /// Build the scaled phases of a suite with workloads bound to `registry`
    pub fn phases(&self, suite: Suite, registry: &MetricRegistry) -> Result<Vec<Phase>> {
        suite
            .plan()
            .into_iter()
            .map(|plan| {
                let workload = self.workload(plan.role, registry)?;
                let phase = Phase::new(plan.name, plan.executor, workload)
                    .with_start_offset(plan.start_offset)
                    .with_pause(plan.pause)
                    .with_tag("scenario", suite.name())
                    .with_tag("approach", plan.role.approach());
                Ok(phase.scaled(self.config.time_scale))
            })
            .collect()
    }

    fn workload(&self, role: Role, registry: &MetricRegistry) -> Result<Arc<dyn Workload>> {
        let recorder = CallRecorder::new(self.transport.clone(), registry);
        let gateway = || GraphqlExecutor::new(recorder.clone(), &self.config.endpoints.gateway);
        let ids = self.config.user_ids.clone();

        let workload: Arc<dyn Workload> = match role {
            Role::Rest => Arc::new(RestWaterfall::new(
                recorder.clone(),
                &self.config.endpoints,
                ids,
                WaterfallMetrics::standalone(registry)?,
            )),
            Role::ComparedRest => Arc::new(RestWaterfall::new(
                recorder.clone(),
                &self.config.endpoints,
                ids,
                WaterfallMetrics::comparison(registry)?,
            )),
            Role::Graphql => Arc::new(AggregatedQuery::new(
                gateway(),
                self.query,
                ids,
                GraphqlMetrics::standalone(registry)?,
            )),
            Role::ComparedGraphql => Arc::new(AggregatedQuery::new(
                gateway(),
                GraphqlQuery::UserDeep,
                ids,
                GraphqlMetrics::comparison(registry)?,
            )),
            Role::Cache(phase) => Arc::new(CacheProbe::new(
                gateway(),
                phase,
                ids,
                CacheMetrics::register(registry)?,
            )),
        };
        Ok(workload)
    }

    /// Run one suite, write its snapshot and check its thresholds
    pub async fn run(&self, suite: Suite) -> Result<SuiteOutcome> {
        let thresholds = suite
            .thresholds()
            .with_context(|| format!("Invalid thresholds in suite {}", suite.name()))?;

        let registry = Arc::new(MetricRegistry::new());
        let phases = self.phases(suite, &registry)?;

        info!("Running suite {} ({} phases)", suite.name(), phases.len());
        let reports = Scheduler::new(registry.clone())
            .run(phases)
            .await
            .with_context(|| format!("Suite {} has an invalid phase plan", suite.name()))?;

        let frozen = registry.freeze();
        let snapshot = Snapshot::extract(&frozen, suite.label(), &suite.metrics());
        self.storage.save(&snapshot, suite.file_name())?;
        info!("{}", snapshot.format_table());

        let verdicts = if self.check_thresholds {
            evaluate(&thresholds, &Snapshot::full(&frozen, suite.label()))
        } else {
            Vec::new()
        };
        for verdict in &verdicts {
            if verdict.outcome.is_breach() {
                warn!("Threshold breached: {}", verdict);
            } else {
                info!("Threshold {}", verdict);
            }
        }

        Ok(SuiteOutcome {
            suite,
            snapshot,
            phases: reports,
            verdicts,
        })
    }

    /// Run suites one after another
    pub async fn run_all(&self, suites: &[Suite]) -> Result<Vec<SuiteOutcome>> {
        let mut outcomes = Vec::with_capacity(suites.len());
        for suite in suites {
            outcomes.push(self.run(*suite).await?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::Outcome;
    use crate::http::mock::ScriptedTransport;

    fn config(dir: &std::path::Path, scale: f64) -> AppConfig {
        AppConfig {
            results_dir: dir.to_path_buf(),
            time_scale: scale,
            ..Default::default()
        }
    }

    #[test]
    fn test_suite_lookup() {
        assert_eq!(Suite::from_str("rest-waterfall"), Some(Suite::RestWaterfall));
        assert_eq!(Suite::from_str("CACHE-IMPACT"), Some(Suite::CacheImpact));
        assert!(Suite::from_str("soak").is_none());

        for suite in Suite::ALL {
            assert_eq!(Suite::from_str(suite.name()), Some(suite));
            assert!(suite.file_name().ends_with("-summary.json"));
        }
    }

    #[test]
    fn test_thresholds_parse_and_whitelist_builtins() {
        for suite in Suite::ALL {
            assert_eq!(suite.thresholds().unwrap().len(), 2);
            let metrics = suite.metrics();
            assert!(metrics.contains(&HTTP_REQ_DURATION));
            assert!(metrics.contains(&HTTP_REQS));
            assert!(metrics.contains(&ITERATIONS));
        }
    }

    #[test]
    fn test_every_plan_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SuiteRunner::new(config(dir.path(), 1.0), Arc::new(ScriptedTransport::new()));

        for suite in Suite::ALL {
            let registry = MetricRegistry::new();
            let phases = runner.phases(suite, &registry).unwrap();
            assert!(Scheduler::validate(&phases).is_ok(), "{}", suite.name());
        }
    }

    #[test]
    fn test_comparison_pairs_run_concurrently() {
        let plan = Suite::Comparison.plan();
        assert_eq!(plan.len(), 6);
        for pair in plan.chunks(2) {
            assert_eq!(pair[0].start_offset, pair[1].start_offset);
            assert_eq!(pair[0].executor, pair[1].executor);
            assert_eq!(pair[0].role, Role::ComparedRest);
            assert_eq!(pair[1].role, Role::ComparedGraphql);
        }
    }

    #[test]
    fn test_load_profile_describes_spike() {
        let profile = Suite::RestWaterfall.load_profile();
        assert_eq!(profile.len(), 4);
        assert_eq!(profile[0], "baseline: 10 actors for 30s, starting at +0s");
        assert_eq!(profile[3], "spike: 0 → 200 → 0 for 40s, starting at +105s");
    }

    #[test]
    fn test_cache_phase_pauses() {
        let plan = Suite::CacheImpact.plan();
        let pause = |name: &str| plan.iter().find(|p| p.name == name).unwrap().pause;
        assert_eq!(pause("warm_cache"), Duration::from_millis(300));
        assert_eq!(pause("mixed_workload"), Duration::from_millis(300));
        assert_eq!(pause("cold_cache"), Duration::from_secs(1));
    }

    #[test]
    fn test_time_scale_shrinks_phases() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SuiteRunner::new(config(dir.path(), 0.01), Arc::new(ScriptedTransport::new()));
        let registry = MetricRegistry::new();

        let phases = runner.phases(Suite::CacheImpact, &registry).unwrap();
        let warm = phases.iter().find(|p| p.name == "warm_cache").unwrap();
        assert_eq!(warm.start_offset, Duration::from_millis(150));
        assert_eq!(warm.pause, Duration::from_millis(3));
        assert_eq!(warm.tags.get("scenario").map(String::as_str), Some("cache-impact"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_graphql_suite_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("http://localhost:8080/graphql", 200, r#"{"data":{"user":{"id":1}}}"#)
                .latency(Duration::from_millis(1)),
        );
        let runner = SuiteRunner::new(config(dir.path(), 0.001), transport);

        let outcome = runner.run(Suite::GraphqlAggregated).await.unwrap();

        assert!(dir.path().join("graphql-aggregated-summary.json").exists());
        assert_eq!(outcome.phases.len(), 4);
        assert!(outcome
            .phases
            .iter()
            .all(|p| p.started == p.completed));
        assert!(outcome.snapshot.metric(names::GRAPHQL_QUERY_TOTAL).is_some());
        assert!(outcome.snapshot.metric(names::REST_WATERFALL_TOTAL).is_none());
        assert_eq!(outcome.breaches().count(), 0);
        assert!(outcome
            .verdicts
            .iter()
            .any(|v| v.threshold.metric == names::GRAPHQL_ERRORS
                && v.outcome == Outcome::Pass(0.0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failing_gateway_breaches_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(
            ScriptedTransport::new()
                .fallback(503, "unavailable")
                .latency(Duration::from_millis(1)),
        );
        let runner = SuiteRunner::new(config(dir.path(), 0.001), transport);

        let outcome = runner.run(Suite::GraphqlAggregated).await.unwrap();

        assert_eq!(outcome.breaches().count(), 1);
        let skipped = SuiteRunner::new(
            config(dir.path(), 0.001),
            Arc::new(ScriptedTransport::new().fallback(503, "unavailable")),
        )
        .with_thresholds(false);
        assert!(skipped
            .run(Suite::GraphqlAggregated)
            .await
            .unwrap()
            .verdicts
            .is_empty());
    }
}
