//! GraphQL requests against the gateway

use serde::Deserialize;
use serde_json::{json, Value};

use super::{CallOutcome, CallRecorder, FailureKind};
use crate::benchmark::Tags;
use crate::http::HttpRequest;

const USER_DEEP: &str = "query UserDeep($id: BigInteger!) { user(id: $id) { id username email fullName orders { id userId status totalAmount createdAt products { id name description price stockQuantity category } payment { id orderId amount method status processedAt } } } }";

const ALL_USERS: &str = "query AllUsers { users { id username email fullName } }";

const DASHBOARD: &str = "query Dashboard { users { id username email fullName } products { id name price category stockQuantity } orders { id status totalAmount createdAt } }";

const ALL_PRODUCTS: &str =
    "query AllProducts { products { id name description price category stockQuantity } }";

/// Queries the harness knows how to send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphqlQuery {
    /// One user with orders, products and payment (same data as the REST waterfall)
    UserDeep,
    /// Single-service list query
    AllUsers,
    /// Three root fields in one request
    Dashboard,
    /// Product catalogue
    Products,
}

impl GraphqlQuery {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user-deep" | "userdeep" => Some(Self::UserDeep),
            "all-users" | "users" => Some(Self::AllUsers),
            "dashboard" => Some(Self::Dashboard),
            "products" => Some(Self::Products),
            _ => None,
        }
    }

    /// Operation name, also used as the `call` tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserDeep => "UserDeep",
            Self::AllUsers => "AllUsers",
            Self::Dashboard => "Dashboard",
            Self::Products => "AllProducts",
        }
    }

    pub fn document(&self) -> &'static str {
        match self {
            Self::UserDeep => USER_DEEP,
            Self::AllUsers => ALL_USERS,
            Self::Dashboard => DASHBOARD,
            Self::Products => ALL_PRODUCTS,
        }
    }

    pub fn variables(&self, user_id: u64) -> Value {
        match self {
            Self::UserDeep => json!({ "id": user_id }),
            _ => json!({}),
        }
    }
}

#[derive(Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

/// Classify a 2xx GraphQL response body
pub fn inspect_body(body: &str) -> Option<FailureKind> {
    match serde_json::from_str::<GraphqlEnvelope>(body) {
        Ok(envelope) if envelope.errors.as_ref().is_some_and(|e| !e.is_empty()) => {
            Some(FailureKind::Protocol)
        }
        Ok(_) => None,
        Err(_) => Some(FailureKind::Malformed),
    }
}

/// Posts `{query, variables}` documents to the gateway
#[derive(Clone)]
pub struct GraphqlExecutor {
    recorder: CallRecorder,
    url: String,
}

impl GraphqlExecutor {
    pub fn new(recorder: CallRecorder, url: impl Into<String>) -> Self {
        Self {
            recorder,
            url: url.into(),
        }
    }

    /// Send one query; a populated `errors` array fails even under HTTP 200
    pub async fn execute(&self, query: GraphqlQuery, user_id: u64, tags: &Tags) -> CallOutcome {
        let body = json!({
            "query": query.document(),
            "variables": query.variables(user_id),
        });

        let mut outcome = self
            .recorder
            .send(HttpRequest::post_json(&self.url, &body), tags)
            .await;

        if outcome.failure.is_none() {
            outcome.failure = inspect_body(&outcome.body);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::MetricRegistry;
    use crate::http::mock::ScriptedTransport;
    use std::sync::Arc;

    #[test]
    fn test_inspect_body() {
        assert_eq!(inspect_body(r#"{"data":{"users":[]}}"#), None);
        assert_eq!(inspect_body(r#"{"data":{},"errors":null}"#), None);
        assert_eq!(inspect_body(r#"{"data":{},"errors":[]}"#), None);
        assert_eq!(
            inspect_body(r#"{"data":null,"errors":[{"message":"boom"}]}"#),
            Some(FailureKind::Protocol)
        );
        assert_eq!(inspect_body("<html>502</html>"), Some(FailureKind::Malformed));
    }

    #[test]
    fn test_query_lookup() {
        assert_eq!(GraphqlQuery::from_str("user-deep"), Some(GraphqlQuery::UserDeep));
        assert_eq!(GraphqlQuery::from_str("Dashboard"), Some(GraphqlQuery::Dashboard));
        assert!(GraphqlQuery::from_str("mutation").is_none());
        assert_eq!(GraphqlQuery::UserDeep.variables(2), json!({ "id": 2 }));
        assert_eq!(GraphqlQuery::Products.variables(2), json!({}));
    }

    #[tokio::test]
    async fn test_execute_posts_query_and_variables() {
        let transport = Arc::new(
            ScriptedTransport::new().route("http://gw/graphql", 200, r#"{"data":{"user":null}}"#),
        );
        let registry = MetricRegistry::new();
        let executor = GraphqlExecutor::new(
            CallRecorder::new(transport.clone(), &registry),
            "http://gw/graphql",
        );

        let outcome = executor
            .execute(GraphqlQuery::UserDeep, 3, &Tags::new())
            .await;
        assert!(!outcome.failed());

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "POST");
        let sent: Value = serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
        assert!(sent["query"].as_str().unwrap().starts_with("query UserDeep"));
        assert_eq!(sent["variables"]["id"], 3);
    }
}
