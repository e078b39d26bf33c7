//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data.
//! `StoreClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; the host executes the actual round-trip.
//! All fields use owned types so values can be queued or moved across tasks
//! without lifetime concerns. `HttpExecutor` is the one place a host plugs
//! its transport in.

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data, filled in by the host after
/// executing an `HttpRequest`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Performs the round-trip for an `HttpRequest` on behalf of the crate.
///
/// Non-2xx statuses are data, not errors: return them as an `HttpResponse`
/// and reserve `Err` (normally `ApiError::Transport`) for requests that never
/// got a response.
#[async_trait::async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}
