//! HTTP client for the services under test
//!
//! Thin reqwest wrapper that times each exchange and classifies transport
//! failures so workloads can record them instead of aborting.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use super::Transport;

/// HTTP client errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// HTTP client for load generation
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create client with custom timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Configured request timeout in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        debug!("Sending {} request to {}", request.method, request.url);

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;
        let url = reqwest::Url::parse(&request.url)
            .map_err(|_| HttpError::InvalidUrl(request.url.clone()))?;

        let mut req_builder = self.client.request(method, url);

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let start = Instant::now();

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                HttpError::ConnectionRefused(request.url.clone())
            } else {
                HttpError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(self.timeout_secs)
            } else {
                HttpError::RequestFailed(e.to_string())
            }
        })?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        debug!(
            "Response: {} {} in {:.2}ms",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            duration_ms
        );

        Ok(HttpResponse {
            status_code: status.as_u16(),
            body,
            duration_ms,
        })
    }
}

/// HTTP request builder
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// POST a JSON document
    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self::post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
    }
}

/// HTTP response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    /// Time from send to fully read body
    pub duration_ms: f64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body size in bytes
    pub fn payload_len(&self) -> usize {
        self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let req = HttpRequest::get("http://example.com")
            .header("Accept", "application/json")
            .header("X-Custom", "value");

        assert_eq!(req.method, "GET");
        assert_eq!(req.headers.len(), 2);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_post_json() {
        let body = serde_json::json!({ "query": "{ users { id } }", "variables": {} });
        let req = HttpRequest::post_json("http://localhost:8080/graphql", &body);

        assert_eq!(req.method, "POST");
        assert_eq!(
            req.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        let sent: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["query"], "{ users { id } }");
    }

    #[test]
    fn test_http_response() {
        let resp = HttpResponse {
            status_code: 200,
            body: "Hello World".to_string(),
            duration_ms: 100.0,
        };

        assert!(resp.is_success());
        assert_eq!(resp.payload_len(), 11);

        let not_found = HttpResponse {
            status_code: 404,
            ..resp
        };
        assert!(!not_found.is_success());
    }

    #[tokio::test]
    async fn test_invalid_url_is_classified() {
        let client = HttpClient::with_timeout(1).unwrap();
        let err = client.send(HttpRequest::get("not a url")).await.unwrap_err();
        assert_eq!(err, HttpError::InvalidUrl("not a url".to_string()));
    }
}
