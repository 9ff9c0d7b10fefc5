//! HTTP transport module
//!
//! Workloads talk to the services under test through the [`Transport`]
//! trait so the network can be replaced in tests.

mod client;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

pub use client::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// A request/response exchange with a remote service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for the full response body
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}
