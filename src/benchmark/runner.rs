//! Scenario scheduler
//!
//! Runs workload phases on a shared run clock. Every phase waits for its
//! start offset, then drives a pool of actors according to its
//! [`ExecutorSpec`]. Phases may overlap; they only share the metric
//! registry, and their observations are told apart by the `phase` tag.
//!
//! An actor always finishes the iteration it is in. Phase expiry is checked
//! between iterations, so no partial iteration is ever recorded.

use futures::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use super::metrics::{MetricHandle, MetricRegistry, Tags};
use crate::utils::Timer;
use crate::workload::{IterationContext, Workload};

/// How often idle ramping actors re-check the target
const RAMP_TICK: Duration = Duration::from_millis(100);

/// Scheduler errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no phases to run")]
    NoPhases,

    #[error("duplicate phase name '{0}'")]
    DuplicatePhase(String),

    #[error("phase '{0}' has no actors")]
    NoActors(String),

    #[error("phase '{0}' has zero duration")]
    ZeroDuration(String),

    #[error("phase '{0}' has no ramp stages")]
    NoStages(String),

    #[error("phase '{0}' has zero iterations per actor")]
    NoIterations(String),
}

/// One leg of a ramping profile: move linearly to `target` over `duration`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

/// Concurrency model of a phase
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutorSpec {
    /// `actors` loop the workload until `duration` elapses
    Fixed { actors: usize, duration: Duration },
    /// Active actor count follows a piecewise-linear profile
    Ramping {
        start_actors: usize,
        stages: Vec<Stage>,
    },
    /// Every actor runs the workload `iterations` times
    PerActorIterations {
        actors: usize,
        iterations: u64,
        max_duration: Duration,
    },
}

impl ExecutorSpec {
    /// Size of the actor pool
    pub fn max_actors(&self) -> usize {
        match self {
            ExecutorSpec::Fixed { actors, .. } => *actors,
            ExecutorSpec::Ramping {
                start_actors,
                stages,
            } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_actors, usize::max),
            ExecutorSpec::PerActorIterations { actors, .. } => *actors,
        }
    }

    /// Upper bound on how long the phase schedules new iterations
    pub fn duration(&self) -> Duration {
        match self {
            ExecutorSpec::Fixed { duration, .. } => *duration,
            ExecutorSpec::Ramping { stages, .. } => stages.iter().map(|s| s.duration).sum(),
            ExecutorSpec::PerActorIterations { max_duration, .. } => *max_duration,
        }
    }

    /// Same profile with every duration multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |d: Duration| d.mul_f64(factor);
        match self {
            ExecutorSpec::Fixed { actors, duration } => ExecutorSpec::Fixed {
                actors: *actors,
                duration: scale(*duration),
            },
            ExecutorSpec::Ramping {
                start_actors,
                stages,
            } => ExecutorSpec::Ramping {
                start_actors: *start_actors,
                stages: stages
                    .iter()
                    .map(|s| Stage::new(scale(s.duration), s.target))
                    .collect(),
            },
            ExecutorSpec::PerActorIterations {
                actors,
                iterations,
                max_duration,
            } => ExecutorSpec::PerActorIterations {
                actors: *actors,
                iterations: *iterations,
                max_duration: scale(*max_duration),
            },
        }
    }

    fn validate(&self, phase: &str) -> Result<(), SchedulerError> {
        if self.max_actors() == 0 {
            return Err(SchedulerError::NoActors(phase.to_string()));
        }
        match self {
            ExecutorSpec::Ramping { stages, .. } if stages.is_empty() => {
                Err(SchedulerError::NoStages(phase.to_string()))
            }
            ExecutorSpec::PerActorIterations { iterations: 0, .. } => {
                Err(SchedulerError::NoIterations(phase.to_string()))
            }
            _ if self.duration().is_zero() => Err(SchedulerError::ZeroDuration(phase.to_string())),
            _ => Ok(()),
        }
    }

    /// Short description of the actor profile, e.g. `0 → 200 → 0`
    pub fn describe_actors(&self) -> String {
        match self {
            ExecutorSpec::Fixed { actors, .. } => format!("{actors} actors"),
            ExecutorSpec::Ramping {
                start_actors,
                stages,
            } => {
                let mut points = vec![*start_actors];
                for stage in stages {
                    if points.last() != Some(&stage.target) {
                        points.push(stage.target);
                    }
                }
                points
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(" → ")
            }
            ExecutorSpec::PerActorIterations {
                actors, iterations, ..
            } => format!("{actors} actors × {iterations} iterations"),
        }
    }
}

/// Target actor count of a ramping profile `elapsed` into the phase
pub fn ramp_target(start_actors: usize, stages: &[Stage], elapsed: Duration) -> usize {
    let mut from = start_actors as f64;
    let mut stage_start = Duration::ZERO;

    for stage in stages {
        let stage_end = stage_start + stage.duration;
        let to = stage.target as f64;
        if elapsed < stage_end {
            let progress = if stage.duration.is_zero() {
                1.0
            } else {
                (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64()
            };
            return (from + (to - from) * progress).round() as usize;
        }
        from = to;
        stage_start = stage_end;
    }

    from as usize
}

/// Lifecycle of a phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseState {
    Pending,
    Running,
    Completed,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseState::Pending => "pending",
            PhaseState::Running => "running",
            PhaseState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// A scheduled interval of workload execution
#[derive(Clone)]
pub struct Phase {
    pub name: String,
    pub executor: ExecutorSpec,
    /// Offset from the start of the run
    pub start_offset: Duration,
    /// Think time between iterations of one actor
    pub pause: Duration,
    pub workload: Arc<dyn Workload>,
    /// Attached to every observation made by this phase
    pub tags: Tags,
}

impl Phase {
    pub fn new(name: impl Into<String>, executor: ExecutorSpec, workload: Arc<dyn Workload>) -> Self {
        let name = name.into();
        let mut tags = Tags::new();
        tags.insert("phase".to_string(), name.clone());
        Self {
            name,
            executor,
            start_offset: Duration::ZERO,
            pause: Duration::ZERO,
            workload,
            tags,
        }
    }

    pub fn with_start_offset(mut self, offset: Duration) -> Self {
        self.start_offset = offset;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Shrink or stretch every offset, duration and pause
    pub fn scaled(mut self, factor: f64) -> Self {
        self.start_offset = self.start_offset.mul_f64(factor);
        self.pause = self.pause.mul_f64(factor);
        self.executor = self.executor.scaled(factor);
        self
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("executor", &self.executor)
            .field("start_offset", &self.start_offset)
            .field("pause", &self.pause)
            .field("workload", &self.workload.name())
            .finish()
    }
}

/// Iteration accounting of one finished phase
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseReport {
    pub name: String,
    pub state: PhaseState,
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Everything an actor needs, shared across the phase's pool
struct PhaseRuntime {
    name: String,
    workload: Arc<dyn Workload>,
    tags: Tags,
    pause: Duration,
    iterations: MetricHandle,
    iteration_duration: MetricHandle,
    counters: Counters,
}

impl PhaseRuntime {
    async fn iterate_once(&self, actor: usize, iteration: u64) {
        self.counters.started.fetch_add(1, Ordering::SeqCst);

        let ctx = IterationContext::new(actor, iteration, self.tags.clone());
        let timer = Timer::start("iteration");
        let result = self.workload.iterate(&ctx).await;
        let elapsed_ms = timer.stop();

        self.iteration_duration.add(elapsed_ms, &self.tags);
        self.iterations.add(1.0, &self.tags);
        if result.failed() {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.counters.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Think time, cut short at the deadline
    async fn pause_until(&self, deadline: Instant) {
        if self.pause.is_zero() {
            return;
        }
        let wake = (Instant::now() + self.pause).min(deadline);
        sleep_until(wake).await;
    }
}

/// Runs phases against one metric registry
pub struct Scheduler {
    registry: Arc<MetricRegistry>,
}

impl Scheduler {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    /// Reject empty plans, duplicate names and degenerate executors
    pub fn validate(phases: &[Phase]) -> Result<(), SchedulerError> {
        if phases.is_empty() {
            return Err(SchedulerError::NoPhases);
        }
        let mut seen = HashSet::new();
        for phase in phases {
            if !seen.insert(phase.name.as_str()) {
                return Err(SchedulerError::DuplicatePhase(phase.name.clone()));
            }
            phase.executor.validate(&phase.name)?;
        }
        Ok(())
    }

    /// Run every phase to completion; overlapping phases run concurrently
    pub async fn run(&self, phases: Vec<Phase>) -> Result<Vec<PhaseReport>, SchedulerError> {
        Self::validate(&phases)?;

        let clock = Instant::now();
        let end = phases
            .iter()
            .map(|p| p.start_offset + p.executor.duration())
            .max()
            .unwrap_or_default();
        info!(
            "Scheduling {} phases, planned run time {:.1}s",
            phases.len(),
            end.as_secs_f64()
        );

        let runs = phases.into_iter().map(|phase| self.run_phase(phase, clock));
        Ok(join_all(runs).await)
    }

    async fn run_phase(&self, phase: Phase, clock: Instant) -> PhaseReport {
        debug!(
            "Phase {}: {} (starts at +{:.1}s)",
            phase.name,
            PhaseState::Pending,
            phase.start_offset.as_secs_f64()
        );
        sleep_until(clock + phase.start_offset).await;

        info!(
            "Phase {}: {} with {} ({})",
            phase.name,
            PhaseState::Running,
            phase.executor.describe_actors(),
            phase.workload.name()
        );

        let builtins = self.registry.builtins();
        let runtime = Arc::new(PhaseRuntime {
            name: phase.name.clone(),
            workload: phase.workload.clone(),
            tags: phase.tags.clone(),
            pause: phase.pause,
            iterations: builtins.iterations.clone(),
            iteration_duration: builtins.iteration_duration.clone(),
            counters: Counters::default(),
        });

        let started_at = Instant::now();
        let handles: Vec<_> = (0..phase.executor.max_actors())
            .map(|actor| {
                let runtime = runtime.clone();
                let executor = phase.executor.clone();
                tokio::spawn(run_actor(actor, executor, runtime, started_at))
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("Actor in phase {} aborted: {}", phase.name, e);
            }
        }

        let report = PhaseReport {
            name: runtime.name.clone(),
            state: PhaseState::Completed,
            started: runtime.counters.started.load(Ordering::SeqCst),
            completed: runtime.counters.completed.load(Ordering::SeqCst),
            failed: runtime.counters.failed.load(Ordering::SeqCst),
            elapsed: started_at.elapsed(),
        };

        let latency = self
            .registry
            .stats_where(&builtins.iteration_duration, "phase", &report.name)
            .and_then(|s| s.as_trend().map(|t| t.format_summary()))
            .unwrap_or_else(|| "no iterations".to_string());
        info!(
            "Phase {}: {} after {:.1}s, {} iterations ({} failed), {}",
            report.name,
            report.state,
            report.elapsed.as_secs_f64(),
            report.completed,
            report.failed,
            latency
        );

        report
    }
}

async fn run_actor(actor: usize, executor: ExecutorSpec, runtime: Arc<PhaseRuntime>, started_at: Instant) {
    match executor {
        ExecutorSpec::Fixed { duration, .. } => {
            let deadline = started_at + duration;
            let mut iteration = 0;
            while Instant::now() < deadline {
                runtime.iterate_once(actor, iteration).await;
                iteration += 1;
                runtime.pause_until(deadline).await;
            }
        }
        ExecutorSpec::Ramping {
            start_actors,
            stages,
        } => {
            let total: Duration = stages.iter().map(|s| s.duration).sum();
            let deadline = started_at + total;
            let mut iteration = 0;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                if actor < ramp_target(start_actors, &stages, now - started_at) {
                    runtime.iterate_once(actor, iteration).await;
                    iteration += 1;
                    runtime.pause_until(deadline).await;
                } else {
                    sleep(RAMP_TICK.min(deadline - now)).await;
                }
            }
        }
        ExecutorSpec::PerActorIterations {
            iterations,
            max_duration,
            ..
        } => {
            let deadline = started_at + max_duration;
            for iteration in 0..iterations {
                if Instant::now() >= deadline {
                    debug!(
                        "Actor {} of phase {} hit the time limit after {} iterations",
                        actor, runtime.name, iteration
                    );
                    break;
                }
                runtime.iterate_once(actor, iteration).await;
                if iteration + 1 < iterations {
                    runtime.pause_until(deadline).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::MetricStats;
    use crate::workload::WorkloadResult;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Sleeps for a fixed time and tracks how many iterations overlap
    struct Probe {
        work: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Probe {
        fn new(work: Duration) -> Arc<Self> {
            Arc::new(Self {
                work,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Workload for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        async fn iterate(&self, _ctx: &IterationContext) -> WorkloadResult {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.work).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            WorkloadResult {
                duration_ms: self.work.as_secs_f64() * 1000.0,
                calls: 1,
                ..Default::default()
            }
        }
    }

    /// Remembers when its first iteration began
    #[derive(Default)]
    struct FirstStart {
        at: std::sync::Mutex<Option<Instant>>,
    }

    impl FirstStart {
        fn at(&self) -> Option<Instant> {
            *self.at.lock().unwrap()
        }
    }

    #[async_trait]
    impl Workload for FirstStart {
        fn name(&self) -> &str {
            "first-start"
        }

        async fn iterate(&self, _ctx: &IterationContext) -> WorkloadResult {
            self.at.lock().unwrap().get_or_insert_with(Instant::now);
            tokio::time::sleep(Duration::from_millis(2)).await;
            WorkloadResult {
                duration_ms: 2.0,
                calls: 1,
                ..Default::default()
            }
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn iterations_counted(registry: &MetricRegistry, phase: &str) -> f64 {
        match registry.stats_where(&registry.builtins().iterations, "phase", phase) {
            Some(MetricStats::Counter(c)) => c.count,
            _ => 0.0,
        }
    }

    #[test]
    fn test_ramp_target() {
        let stages = [
            Stage::new(Duration::from_secs(10), 200),
            Stage::new(Duration::from_secs(20), 200),
            Stage::new(Duration::from_secs(10), 0),
        ];
        assert_eq!(ramp_target(0, &stages, Duration::ZERO), 0);
        assert_eq!(ramp_target(0, &stages, Duration::from_secs(5)), 100);
        assert_eq!(ramp_target(0, &stages, Duration::from_secs(10)), 200);
        assert_eq!(ramp_target(0, &stages, Duration::from_secs(25)), 200);
        assert_eq!(ramp_target(0, &stages, Duration::from_secs(35)), 100);
        assert_eq!(ramp_target(0, &stages, Duration::from_secs(60)), 0);

        let from_ten = [Stage::new(Duration::from_secs(15), 80)];
        assert_eq!(ramp_target(10, &from_ten, Duration::ZERO), 10);
        assert_eq!(ramp_target(10, &from_ten, Duration::from_secs(15)), 80);
    }

    #[test]
    fn test_executor_shape() {
        let spike = ExecutorSpec::Ramping {
            start_actors: 0,
            stages: vec![
                Stage::new(Duration::from_secs(10), 200),
                Stage::new(Duration::from_secs(20), 200),
                Stage::new(Duration::from_secs(10), 0),
            ],
        };
        assert_eq!(spike.max_actors(), 200);
        assert_eq!(spike.duration(), Duration::from_secs(40));
        assert_eq!(spike.describe_actors(), "0 → 200 → 0");
        assert_eq!(spike.scaled(0.1).duration(), Duration::from_secs(4));
    }

    #[test]
    fn test_validate() {
        let probe: Arc<dyn Workload> = Probe::new(ms(1));
        let fixed = |name: &str, actors| {
            Phase::new(
                name,
                ExecutorSpec::Fixed {
                    actors,
                    duration: ms(10),
                },
                probe.clone(),
            )
        };

        assert_eq!(Scheduler::validate(&[]), Err(SchedulerError::NoPhases));
        assert_eq!(
            Scheduler::validate(&[fixed("a", 1), fixed("a", 1)]),
            Err(SchedulerError::DuplicatePhase("a".to_string()))
        );
        assert_eq!(
            Scheduler::validate(&[fixed("idle", 0)]),
            Err(SchedulerError::NoActors("idle".to_string()))
        );

        let no_stages = Phase::new(
            "ramp",
            ExecutorSpec::Ramping {
                start_actors: 5,
                stages: vec![],
            },
            probe.clone(),
        );
        assert_eq!(
            Scheduler::validate(&[no_stages]),
            Err(SchedulerError::NoStages("ramp".to_string()))
        );

        let zero = Phase::new(
            "cold",
            ExecutorSpec::PerActorIterations {
                actors: 2,
                iterations: 0,
                max_duration: ms(100),
            },
            probe,
        );
        assert_eq!(
            Scheduler::validate(&[zero]),
            Err(SchedulerError::NoIterations("cold".to_string()))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fixed_phase_loses_no_iterations() {
        let registry = Arc::new(MetricRegistry::new());
        let probe = Probe::new(ms(5));
        let phase = Phase::new(
            "baseline",
            ExecutorSpec::Fixed {
                actors: 8,
                duration: ms(200),
            },
            probe.clone(),
        )
        .with_pause(ms(2));

        let reports = Scheduler::new(registry.clone()).run(vec![phase]).await.unwrap();

        let report = &reports[0];
        assert_eq!(report.state, PhaseState::Completed);
        assert!(report.started > 0);
        assert_eq!(report.started, report.completed);
        assert_eq!(iterations_counted(&registry, "baseline"), report.completed as f64);
        assert_eq!(
            registry.builtins().iteration_duration.len() as u64,
            report.completed
        );
        assert!(probe.peak() <= 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ramping_never_exceeds_peak_target() {
        let registry = Arc::new(MetricRegistry::new());
        let probe = Probe::new(ms(10));
        let phase = Phase::new(
            "spike",
            ExecutorSpec::Ramping {
                start_actors: 0,
                stages: vec![
                    Stage::new(ms(150), 4),
                    Stage::new(ms(150), 4),
                    Stage::new(ms(150), 0),
                ],
            },
            probe.clone(),
        );

        let reports = Scheduler::new(registry).run(vec![phase]).await.unwrap();

        assert!(reports[0].completed > 0);
        assert_eq!(reports[0].started, reports[0].completed);
        assert!(probe.peak() >= 1);
        assert!(probe.peak() <= 4, "peak concurrency {}", probe.peak());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_per_actor_iterations_are_exact() {
        let registry = Arc::new(MetricRegistry::new());
        let phase = Phase::new(
            "cold_cache",
            ExecutorSpec::PerActorIterations {
                actors: 3,
                iterations: 4,
                max_duration: Duration::from_secs(30),
            },
            Probe::new(ms(1)),
        )
        .with_pause(ms(1));

        let reports = Scheduler::new(registry.clone()).run(vec![phase]).await.unwrap();

        assert_eq!(reports[0].completed, 12);
        assert_eq!(iterations_counted(&registry, "cold_cache"), 12.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_phases_run_side_by_side() {
        let registry = Arc::new(MetricRegistry::new());
        let rest = Probe::new(ms(5));
        let gql = Probe::new(ms(5));
        let fixed = || ExecutorSpec::Fixed {
            actors: 2,
            duration: ms(150),
        };

        let phases = vec![
            Phase::new("rest_baseline", fixed(), rest).with_tag("approach", "REST"),
            Phase::new("gql_baseline", fixed(), gql)
                .with_tag("approach", "GraphQL")
                .with_start_offset(ms(20)),
        ];

        let started = Instant::now();
        let reports = Scheduler::new(registry.clone()).run(phases).await.unwrap();

        // concurrent, not back to back
        assert!(started.elapsed() < ms(290));
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "rest_baseline");
        assert!(reports.iter().all(|r| r.completed > 0));
        match registry.stats_where(&registry.builtins().iterations, "approach", "GraphQL") {
            Some(MetricStats::Counter(c)) => assert_eq!(c.count, reports[1].completed as f64),
            other => panic!("unexpected stats: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delayed_phase_waits_for_its_offset() {
        let registry = Arc::new(MetricRegistry::new());
        let early = Arc::new(FirstStart::default());
        let late = Arc::new(FirstStart::default());
        let fixed = || ExecutorSpec::Fixed {
            actors: 2,
            duration: ms(60),
        };

        let phases = vec![
            Phase::new("warm_cache", fixed(), early.clone()),
            Phase::new("warm_stress", fixed(), late.clone()).with_start_offset(ms(100)),
        ];

        let clock = Instant::now();
        let reports = Scheduler::new(registry).run(phases).await.unwrap();

        let early_at = early.at().unwrap();
        let late_at = late.at().unwrap();
        assert!(early_at.duration_since(clock) < ms(100));
        assert!(
            late_at.duration_since(clock) >= ms(100),
            "delayed phase began after {:?}",
            late_at.duration_since(clock)
        );
        assert!(reports.iter().all(|r| r.state == PhaseState::Completed && r.completed > 0));
    }
}
