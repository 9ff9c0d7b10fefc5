//! GraphQL aggregated workload
//!
//! The same logical data as the REST waterfall, fetched with a single query
//! that the gateway fans out internally.

use async_trait::async_trait;

use super::names;
use super::{
    pick_user, record_outcome, GraphqlExecutor, GraphqlQuery, IterationContext, Workload,
    WorkloadResult,
};
use crate::benchmark::{MetricError, MetricHandle, MetricRegistry};

/// Metric handles an aggregated iteration writes to
#[derive(Clone, Debug)]
pub struct GraphqlMetrics {
    total: MetricHandle,
    payload: MetricHandle,
    errors: MetricHandle,
    requests: MetricHandle,
}

impl GraphqlMetrics {
    pub fn standalone(registry: &MetricRegistry) -> Result<Self, MetricError> {
        Ok(Self {
            total: registry.trend(names::GRAPHQL_QUERY_TOTAL)?,
            payload: registry.trend(names::GRAPHQL_PAYLOAD)?,
            errors: registry.rate(names::GRAPHQL_ERRORS)?,
            requests: registry.counter(names::GRAPHQL_TOTAL_REQUESTS)?,
        })
    }

    pub fn comparison(registry: &MetricRegistry) -> Result<Self, MetricError> {
        Ok(Self {
            total: registry.trend(names::CMP_GQL_DURATION)?,
            payload: registry.trend(names::CMP_GQL_PAYLOAD)?,
            errors: registry.rate(names::CMP_GQL_ERRORS)?,
            requests: registry.counter(names::CMP_GQL_CALLS)?,
        })
    }
}

/// One gateway query per iteration
pub struct AggregatedQuery {
    executor: GraphqlExecutor,
    query: GraphqlQuery,
    user_ids: Vec<u64>,
    metrics: GraphqlMetrics,
}

impl AggregatedQuery {
    pub fn new(
        executor: GraphqlExecutor,
        query: GraphqlQuery,
        user_ids: Vec<u64>,
        metrics: GraphqlMetrics,
    ) -> Self {
        Self {
            executor,
            query,
            user_ids,
            metrics,
        }
    }
}

#[async_trait]
impl Workload for AggregatedQuery {
    fn name(&self) -> &str {
        "graphql-aggregated"
    }

    async fn iterate(&self, ctx: &IterationContext) -> WorkloadResult {
        let user_id = pick_user(&self.user_ids);
        let tags = ctx.call_tags(self.query.name());

        let outcome = self.executor.execute(self.query, user_id, &tags).await;

        self.metrics.total.add(outcome.duration_ms, &ctx.tags);
        self.metrics
            .payload
            .add(outcome.payload_bytes as f64, &ctx.tags);
        self.metrics.requests.add(1.0, &ctx.tags);
        record_outcome(&self.metrics.errors, outcome.failure, &tags);

        WorkloadResult {
            duration_ms: outcome.duration_ms,
            payload_bytes: outcome.payload_bytes,
            calls: 1,
            failure: outcome.failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{tags, MetricStats};
    use crate::http::mock::ScriptedTransport;
    use crate::workload::{CallRecorder, FailureKind};
    use std::sync::Arc;

    const GATEWAY: &str = "http://gw/graphql";

    fn workload(transport: Arc<ScriptedTransport>, registry: &MetricRegistry) -> AggregatedQuery {
        AggregatedQuery::new(
            GraphqlExecutor::new(CallRecorder::new(transport, registry), GATEWAY),
            GraphqlQuery::UserDeep,
            vec![1, 2, 3],
            GraphqlMetrics::standalone(registry).unwrap(),
        )
    }

    fn ctx() -> IterationContext {
        IterationContext::new(0, 0, tags([("phase", "baseline")]))
    }

    #[tokio::test]
    async fn test_single_downstream_call() {
        let body = r#"{"data":{"user":{"id":1,"orders":[{"id":10,"products":[{"id":100},{"id":101}],"payment":{"id":5}}]}}}"#;
        let transport = Arc::new(ScriptedTransport::new().route(GATEWAY, 200, body));
        let registry = MetricRegistry::new();

        let result = workload(transport.clone(), &registry).iterate(&ctx()).await;

        assert_eq!(transport.call_count(), 1);
        assert_eq!(result.calls, 1);
        assert_eq!(result.payload_bytes, body.len());
        assert!(!result.failed());
        assert_eq!(registry.builtins().http_reqs.len(), 1);
    }

    #[tokio::test]
    async fn test_errors_under_200_count_as_failure() {
        let transport = Arc::new(ScriptedTransport::new().route(
            GATEWAY,
            200,
            r#"{"data":{"user":null},"errors":[{"message":"user service unavailable"}]}"#,
        ));
        let registry = MetricRegistry::new();
        let errors = registry.rate(names::GRAPHQL_ERRORS).unwrap();

        let result = workload(transport, &registry).iterate(&ctx()).await;

        assert_eq!(result.failure, Some(FailureKind::Protocol));
        match registry.stats_where(&errors, "kind", "protocol") {
            Some(MetricStats::Rate(r)) => assert_eq!(r.rate, 1.0),
            other => panic!("unexpected stats: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_counts_as_failure() {
        let transport = Arc::new(ScriptedTransport::new().route(GATEWAY, 200, "<html>oops</html>"));
        let registry = MetricRegistry::new();

        let result = workload(transport, &registry).iterate(&ctx()).await;

        assert_eq!(result.failure, Some(FailureKind::Malformed));
    }
}
