//! Gateway cache probes
//!
//! Cold iterations walk every cacheable query once to populate the gateway
//! cache; warm iterations repeat the user query; mixed iterations draw from
//! a weighted blend of queries.

use async_trait::async_trait;

use super::names;
use super::{
    pick_user, record_outcome, GraphqlExecutor, GraphqlQuery, IterationContext, Workload,
    WorkloadResult,
};
use crate::benchmark::{MetricError, MetricHandle, MetricRegistry};
use crate::utils::Timer;

/// Cache temperature a probe measures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePhase {
    Cold,
    Warm,
    Mixed,
}

impl CachePhase {
    pub fn name(&self) -> &'static str {
        match self {
            CachePhase::Cold => "cold",
            CachePhase::Warm => "warm",
            CachePhase::Mixed => "mixed",
        }
    }
}

/// Metrics shared by every cache phase
#[derive(Clone, Debug)]
pub struct CacheMetrics {
    cold: MetricHandle,
    warm: MetricHandle,
    mixed: MetricHandle,
    errors: MetricHandle,
    requests: MetricHandle,
}

impl CacheMetrics {
    pub fn register(registry: &MetricRegistry) -> Result<Self, MetricError> {
        Ok(Self {
            cold: registry.trend(names::COLD_CACHE_DURATION)?,
            warm: registry.trend(names::WARM_CACHE_DURATION)?,
            mixed: registry.trend(names::MIXED_CACHE_DURATION)?,
            errors: registry.rate(names::CACHE_TEST_ERRORS)?,
            requests: registry.counter(names::CACHE_TOTAL_REQUESTS)?,
        })
    }

    fn duration_for(&self, phase: CachePhase) -> &MetricHandle {
        match phase {
            CachePhase::Cold => &self.cold,
            CachePhase::Warm => &self.warm,
            CachePhase::Mixed => &self.mixed,
        }
    }
}

/// Query for a uniform roll in `[0, 1)`: 40% user-deep, 30% dashboard,
/// 30% products
pub fn mixed_query(roll: f64) -> GraphqlQuery {
    if roll < 0.4 {
        GraphqlQuery::UserDeep
    } else if roll < 0.7 {
        GraphqlQuery::Dashboard
    } else {
        GraphqlQuery::Products
    }
}

/// Cache-impact workload for one phase
pub struct CacheProbe {
    executor: GraphqlExecutor,
    phase: CachePhase,
    user_ids: Vec<u64>,
    metrics: CacheMetrics,
}

impl CacheProbe {
    pub fn new(
        executor: GraphqlExecutor,
        phase: CachePhase,
        user_ids: Vec<u64>,
        metrics: CacheMetrics,
    ) -> Self {
        Self {
            executor,
            phase,
            user_ids,
            metrics,
        }
    }

    /// Queries issued by one iteration, in order
    fn plan(&self) -> Vec<(GraphqlQuery, u64)> {
        match self.phase {
            CachePhase::Cold => self
                .user_ids
                .iter()
                .map(|id| (GraphqlQuery::UserDeep, *id))
                .chain([(GraphqlQuery::Dashboard, 0), (GraphqlQuery::Products, 0)])
                .collect(),
            CachePhase::Warm => vec![(GraphqlQuery::UserDeep, pick_user(&self.user_ids))],
            CachePhase::Mixed => {
                let query = mixed_query(rand::random::<f64>());
                vec![(query, pick_user(&self.user_ids))]
            }
        }
    }
}

#[async_trait]
impl Workload for CacheProbe {
    fn name(&self) -> &str {
        self.phase.name()
    }

    async fn iterate(&self, ctx: &IterationContext) -> WorkloadResult {
        let duration = self.metrics.duration_for(self.phase);
        let timer = Timer::start("cache_probe");
        let mut result = WorkloadResult::default();

        for (query, user_id) in self.plan() {
            let tags = ctx.call_tags(query.name());
            let outcome = self.executor.execute(query, user_id, &tags).await;

            duration.add(outcome.duration_ms, &ctx.tags);
            self.metrics.requests.add(1.0, &ctx.tags);
            record_outcome(&self.metrics.errors, outcome.failure, &tags);

            result.calls += 1;
            result.payload_bytes += outcome.payload_bytes;
            if result.failure.is_none() {
                result.failure = outcome.failure;
            }
        }

        result.duration_ms = timer.stop();
        result
    }
}
