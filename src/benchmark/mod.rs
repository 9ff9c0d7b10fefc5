//! Load generation module
//!
//! Metric registry, phase scheduler, threshold checks and the predefined
//! benchmark suites built on top of them.

#![allow(dead_code)]
#![allow(unused_imports)]

mod metrics;
mod runner;
mod suites;
mod thresholds;

pub use metrics::{
    percentile, tags, BuiltinMetrics, CounterStats, FrozenMetrics, MetricError, MetricHandle,
    MetricKind, MetricRegistry, MetricStats, RateStats, Tags, TrendStats, HTTP_REQS,
    HTTP_REQ_DURATION, ITERATIONS, ITERATION_DURATION,
};
pub use runner::{
    ramp_target, ExecutorSpec, Phase, PhaseReport, PhaseState, Scheduler, SchedulerError, Stage,
};
pub use suites::{PhasePlan, Role, Suite, SuiteOutcome, SuiteRunner};
pub use thresholds::{evaluate, Expr, Op, Outcome, Threshold, ThresholdError, Verdict};
