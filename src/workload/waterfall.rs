//! REST waterfall workload
//!
//! Builds one user's order history the way a client without an aggregating
//! gateway has to: fetch the user, then the user's orders, then every product
//! and the payment of each order, one HTTP round trip at a time.
//!
//! The orders URL only needs the chosen user id, so a failed user call is
//! recorded and the walk still asks for orders. A failed or unparseable
//! orders call ends the iteration since every later call depends on its
//! result. Product and payment calls are leaves, so their failures are
//! recorded and the walk carries on.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::names;
use super::{
    pick_user, record_outcome, CallOutcome, CallRecorder, FailureKind, IterationContext,
    Workload, WorkloadResult,
};
use crate::benchmark::{MetricError, MetricHandle, MetricRegistry};
use crate::config::Endpoints;
use crate::http::HttpRequest;
use crate::utils::Timer;

/// Granularity of the error Rate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorScope {
    /// One observation per HTTP call
    PerCall,
    /// One observation per iteration, true if any call failed
    PerIteration,
}

#[derive(Clone, Debug)]
struct LegTrends {
    user: MetricHandle,
    orders: MetricHandle,
    products: MetricHandle,
    payment: MetricHandle,
}

/// Metric handles a waterfall iteration writes to
#[derive(Clone, Debug)]
pub struct WaterfallMetrics {
    total: MetricHandle,
    payload: MetricHandle,
    calls: MetricHandle,
    errors: MetricHandle,
    scope: ErrorScope,
    legs: Option<LegTrends>,
}

impl WaterfallMetrics {
    /// Full breakdown with per-leg trends and per-call errors
    pub fn standalone(registry: &MetricRegistry) -> Result<Self, MetricError> {
        Ok(Self {
            total: registry.trend(names::REST_WATERFALL_TOTAL)?,
            payload: registry.trend(names::REST_TOTAL_PAYLOAD)?,
            calls: registry.counter(names::REST_TOTAL_HTTP_CALLS)?,
            errors: registry.rate(names::REST_HTTP_ERRORS)?,
            scope: ErrorScope::PerCall,
            legs: Some(LegTrends {
                user: registry.trend(names::REST_USER_CALL)?,
                orders: registry.trend(names::REST_ORDERS_CALL)?,
                products: registry.trend(names::REST_PRODUCTS_SCATTER)?,
                payment: registry.trend(names::REST_PAYMENT_CALL)?,
            }),
        })
    }

    /// Iteration-level metrics used when running next to the GraphQL side
    pub fn comparison(registry: &MetricRegistry) -> Result<Self, MetricError> {
        Ok(Self {
            total: registry.trend(names::CMP_REST_DURATION)?,
            payload: registry.trend(names::CMP_REST_PAYLOAD)?,
            calls: registry.counter(names::CMP_REST_CALLS)?,
            errors: registry.rate(names::CMP_REST_ERRORS)?,
            scope: ErrorScope::PerIteration,
            legs: None,
        })
    }

    #[cfg(test)]
    pub fn scope(&self) -> ErrorScope {
        self.scope
    }
}

#[derive(Deserialize)]
struct OrderRef {
    id: u64,
    #[serde(default, rename = "productIds")]
    product_ids: Option<Vec<u64>>,
}

#[derive(Default)]
struct Progress {
    calls: u32,
    payload_bytes: usize,
    failure: Option<FailureKind>,
}

/// User, orders, products and payments fetched call by call
pub struct RestWaterfall {
    recorder: CallRecorder,
    endpoints: Endpoints,
    user_ids: Vec<u64>,
    metrics: WaterfallMetrics,
}

impl RestWaterfall {
    pub fn new(
        recorder: CallRecorder,
        endpoints: &Endpoints,
        user_ids: Vec<u64>,
        metrics: WaterfallMetrics,
    ) -> Self {
        Self {
            recorder,
            endpoints: endpoints.clone(),
            user_ids,
            metrics,
        }
    }

    async fn call(&self, url: String, leg: &str, ctx: &IterationContext, p: &mut Progress) -> CallOutcome {
        let outcome = self
            .recorder
            .send(HttpRequest::get(url), &ctx.call_tags(leg))
            .await;
        p.calls += 1;
        p.payload_bytes += outcome.payload_bytes;
        outcome
    }

    fn settle(&self, leg: &str, failure: Option<FailureKind>, ctx: &IterationContext, p: &mut Progress) {
        if self.metrics.scope == ErrorScope::PerCall {
            record_outcome(&self.metrics.errors, failure, &ctx.call_tags(leg));
        }
        if p.failure.is_none() {
            p.failure = failure;
        }
    }

    fn observe_leg(&self, pick: fn(&LegTrends) -> &MetricHandle, value: f64, ctx: &IterationContext) {
        if let Some(legs) = &self.metrics.legs {
            pick(legs).add(value, &ctx.tags);
        }
    }

    async fn walk(&self, user_id: u64, ctx: &IterationContext, p: &mut Progress) {
        let ep = &self.endpoints;

        let user = self
            .call(format!("{}/users/{}", ep.user, user_id), "user", ctx, p)
            .await;
        self.observe_leg(|l| &l.user, user.duration_ms, ctx);
        self.settle("user", user.failure, ctx, p);

        let mut orders = self
            .call(format!("{}/orders/user/{}", ep.order, user_id), "orders", ctx, p)
            .await;
        self.observe_leg(|l| &l.orders, orders.duration_ms, ctx);
        let parsed = match orders.failure {
            None => match serde_json::from_str::<Vec<OrderRef>>(&orders.body) {
                Ok(list) => Some(list),
                Err(e) => {
                    debug!("Unparseable orders for user {}: {}", user_id, e);
                    orders.failure = Some(FailureKind::Malformed);
                    None
                }
            },
            Some(_) => None,
        };
        self.settle("orders", orders.failure, ctx, p);
        let Some(orders) = parsed else {
            return;
        };

        for order in orders {
            let product_ids = order.product_ids.unwrap_or_default();
            if !product_ids.is_empty() {
                let scatter = Timer::start("products_scatter");
                for pid in product_ids {
                    let product = self
                        .call(format!("{}/products/{}", ep.product, pid), "products", ctx, p)
                        .await;
                    self.settle("products", product.failure, ctx, p);
                }
                self.observe_leg(|l| &l.products, scatter.stop(), ctx);
            }

            let payment = self
                .call(format!("{}/payments/order/{}", ep.payment, order.id), "payment", ctx, p)
                .await;
            self.observe_leg(|l| &l.payment, payment.duration_ms, ctx);
            self.settle("payment", payment.failure, ctx, p);
        }
    }
}

#[async_trait]
impl Workload for RestWaterfall {
    fn name(&self) -> &str {
        "rest-waterfall"
    }

    async fn iterate(&self, ctx: &IterationContext) -> WorkloadResult {
        let user_id = pick_user(&self.user_ids);
        let timer = Timer::start("rest_waterfall");
        let mut progress = Progress::default();

        self.walk(user_id, ctx, &mut progress).await;

        let duration_ms = timer.stop();
        self.metrics.total.add(duration_ms, &ctx.tags);
        self.metrics
            .payload
            .add(progress.payload_bytes as f64, &ctx.tags);
        self.metrics.calls.add(f64::from(progress.calls), &ctx.tags);
        if self.metrics.scope == ErrorScope::PerIteration {
            record_outcome(&self.metrics.errors, progress.failure, &ctx.tags);
        }

        WorkloadResult {
            duration_ms,
            payload_bytes: progress.payload_bytes,
            calls: progress.calls,
            failure: progress.failure,
        }
    }
}
