//! Scripted in-memory transport for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{HttpError, HttpRequest, HttpResponse, Transport};

/// Canned reply for a URL
#[derive(Clone, Debug)]
pub enum Reply {
    Status(u16, String),
    Error(HttpError),
}

/// Transport answering from a URL table and recording every request
pub struct ScriptedTransport {
    routes: HashMap<String, Reply>,
    fallback: Reply,
    latency: Duration,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: Reply::Status(404, r#"{"error":"not found"}"#.to_string()),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.routes
            .insert(url.into(), Reply::Status(status, body.into()));
        self
    }

    pub fn route_error(mut self, url: impl Into<String>, error: HttpError) -> Self {
        self.routes.insert(url.into(), Reply::Error(error));
        self
    }

    pub fn fallback(mut self, status: u16, body: impl Into<String>) -> Self {
        self.fallback = Reply::Status(status, body.into());
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let reply = self
            .routes
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        self.calls.lock().unwrap().push(request);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            Reply::Status(status_code, body) => Ok(HttpResponse {
                status_code,
                body,
                duration_ms: self.latency.as_secs_f64() * 1000.0,
            }),
            Reply::Error(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_and_fallback() {
        let transport = ScriptedTransport::new()
            .route("http://users/1", 200, r#"{"id":1}"#)
            .route_error("http://down/1", HttpError::ConnectionRefused("down".to_string()));

        let ok = tokio_test::block_on(transport.send(HttpRequest::get("http://users/1"))).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.body, r#"{"id":1}"#);

        let missing = tokio_test::block_on(transport.send(HttpRequest::get("http://users/9"))).unwrap();
        assert_eq!(missing.status_code, 404);

        let err = tokio_test::block_on(transport.send(HttpRequest::get("http://down/1")));
        assert!(matches!(err, Err(HttpError::ConnectionRefused(_))));

        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.calls()[1].url, "http://users/9");
    }
}
