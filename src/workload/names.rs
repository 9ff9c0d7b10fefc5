//! Metric names recorded by the workloads and read back by the report

// REST waterfall suite
pub const REST_WATERFALL_TOTAL: &str = "rest_waterfall_total_ms";
pub const REST_USER_CALL: &str = "rest_user_call_ms";
pub const REST_ORDERS_CALL: &str = "rest_orders_call_ms";
pub const REST_PRODUCTS_SCATTER: &str = "rest_products_scatter_ms";
pub const REST_PAYMENT_CALL: &str = "rest_payment_call_ms";
pub const REST_TOTAL_PAYLOAD: &str = "rest_total_payload_bytes";
pub const REST_HTTP_ERRORS: &str = "rest_http_errors";
pub const REST_TOTAL_HTTP_CALLS: &str = "rest_total_http_calls";

// GraphQL aggregated suite
pub const GRAPHQL_QUERY_TOTAL: &str = "graphql_query_total_ms";
pub const GRAPHQL_PAYLOAD: &str = "graphql_payload_bytes";
pub const GRAPHQL_ERRORS: &str = "graphql_errors";
pub const GRAPHQL_TOTAL_REQUESTS: &str = "graphql_total_requests";

// Side-by-side comparison suite
pub const CMP_REST_DURATION: &str = "rest_total_duration_ms";
pub const CMP_REST_PAYLOAD: &str = "rest_payload_bytes";
pub const CMP_REST_CALLS: &str = "rest_http_call_count";
pub const CMP_REST_ERRORS: &str = "rest_error_rate";
pub const CMP_GQL_DURATION: &str = "gql_total_duration_ms";
pub const CMP_GQL_PAYLOAD: &str = "gql_payload_bytes";
pub const CMP_GQL_CALLS: &str = "gql_http_call_count";
pub const CMP_GQL_ERRORS: &str = "gql_error_rate";

// Cache impact suite
pub const COLD_CACHE_DURATION: &str = "cold_cache_duration_ms";
pub const WARM_CACHE_DURATION: &str = "warm_cache_duration_ms";
pub const MIXED_CACHE_DURATION: &str = "mixed_cache_duration_ms";
pub const CACHE_TEST_ERRORS: &str = "cache_test_errors";
pub const CACHE_TOTAL_REQUESTS: &str = "cache_total_requests";
