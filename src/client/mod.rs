//! HTTP transport used by the workers
//!
//! This module contains:
//! - The `Transport` seam the worker loop calls into
//! - `OutgoingRequest` construction, including the counter query tag
//! - The shared reqwest-backed `HttpClient` with in-client retry
//! - Classification of transport failures

mod error;
mod http;
mod request;

pub use error::{classify_failure, TransportError};
pub use http::{build_http_client, HttpClient, RetryPolicy, RETRY_STATUSES};
pub use request::{tag_url, OutgoingRequest};

use async_trait::async_trait;

/// Performs a GET and reports the final status or a classified failure
///
/// Implementations own any in-client retry; callers only see what is left
/// after it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &OutgoingRequest) -> Result<u16, TransportError>;
}
