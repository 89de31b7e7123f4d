//! Shared HTTP client
//!
//! One reqwest `Client` per certificate-verification mode, shared by every
//! worker for connection pooling. Transient statuses are retried here, with
//! exponential backoff, before the caller ever sees them.

use crate::client::{OutgoingRequest, Transport, TransportError};
use crate::config::{Config, RetryConfig};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::time::Duration;

/// Statuses retried inside the client
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound for the connect phase, never above the request timeout
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// In-client retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Returns true if `status` should be retried after `attempt` attempts
    pub fn should_retry(&self, status: u16, attempt: u32) -> bool {
        RETRY_STATUSES.contains(&status) && attempt < self.max_retries
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Builds a pooled HTTP client
///
/// # Arguments
///
/// * `tls_verify` - Whether server certificates are verified
/// * `timeout` - Default whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(tls_verify: bool, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .pool_idle_timeout(Duration::from_secs(90))
        .danger_accept_invalid_certs(!tls_verify)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Reqwest-backed transport shared by all workers
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Client verifying server certificates
    verified: Client,

    /// Client accepting any server certificate
    unverified: Client,

    retry: RetryPolicy,
}

impl HttpClient {
    /// Creates the client pair
    pub fn new(retry: RetryPolicy, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            verified: build_http_client(true, timeout)?,
            unverified: build_http_client(false, timeout)?,
            retry,
        })
    }

    /// Creates a client from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            RetryPolicy::from(&config.retry),
            config.dispatch.request_timeout(),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn client_for(&self, tls_verify: bool) -> &Client {
        if tls_verify {
            &self.verified
        } else {
            &self.unverified
        }
    }

    /// Issues one attempt and drains the body so the connection can be reused
    ///
    /// A body that fails to arrive (a stall past the timeout, a reset) fails
    /// the attempt even though the status line was received.
    async fn attempt(&self, request: &OutgoingRequest) -> Result<u16, TransportError> {
        let response = self
            .client_for(request.tls_verify)
            .get(&request.url)
            .header(USER_AGENT, &request.user_agent)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        response.bytes().await.map_err(|e| {
            tracing::debug!("Body of {} ({}) did not arrive: {}", request.url, status, e);
            TransportError::from_reqwest(&e)
        })?;

        Ok(status)
    }
}

#[async_trait]
impl Transport for HttpClient {
    /// Performs the GET, retrying transient statuses
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 429 / 500 / 502 / 503 / 504 | Retry up to `max_retries`, `base × 2^n` delay |
    /// | Any other status | Return immediately |
    /// | Transport failure | Return classified error immediately |
    async fn get(&self, request: &OutgoingRequest) -> Result<u16, TransportError> {
        let mut attempt = 0;
        loop {
            let status = self.attempt(request).await?;

            if !self.retry.should_retry(status, attempt) {
                return Ok(status);
            }

            let delay = self.retry.backoff(attempt);
            tracing::debug!(
                "{} returned {}, retry {}/{} in {:?}",
                request.url,
                status,
                attempt + 1,
                self.retry.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
