use serde::Deserialize;
use std::time::Duration;

/// Workers per site used when no valid value is supplied
pub const DEFAULT_WORKERS_PER_SITE: u32 = 5;

/// Inclusive bounds accepted for workers per site
pub const WORKERS_PER_SITE_RANGE: std::ops::RangeInclusive<u32> = 1..=20;

/// Main configuration structure for Sumi-Flow
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(rename = "site", default)]
    pub sites: Vec<SiteEntry>,
}

/// What a site's workers do once every endpoint has been pruned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustedPolicy {
    /// Keep the workers alive, retrying selection after a delay
    #[default]
    Idle,
    /// Let the site's workers exit
    Exit,
}

/// Worker loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Workers started per site (overridable from the command line)
    #[serde(rename = "workers-per-site", default)]
    pub workers_per_site: Option<i64>,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether TLS certificates are verified
    #[serde(rename = "tls-verify", default)]
    pub tls_verify: bool,

    /// Lower bound of the randomized inter-request sleep (milliseconds)
    #[serde(rename = "min-sleep-ms", default = "default_min_sleep_ms")]
    pub min_sleep_ms: u64,

    /// Upper bound of the randomized inter-request sleep (milliseconds)
    #[serde(rename = "max-sleep-ms", default = "default_max_sleep_ms")]
    pub max_sleep_ms: u64,

    /// Extra delay after a 429 response (milliseconds)
    #[serde(rename = "rate-limit-delay-ms", default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Delay after a connect timeout (milliseconds)
    #[serde(
        rename = "connect-timeout-delay-ms",
        default = "default_connect_timeout_delay_ms"
    )]
    pub connect_timeout_delay_ms: u64,

    /// Delay after TLS, read timeout and other transport errors (milliseconds)
    #[serde(rename = "error-delay-ms", default = "default_error_delay_ms")]
    pub error_delay_ms: u64,

    /// Delay between selection attempts on an exhausted site (milliseconds)
    #[serde(rename = "exhausted-retry-ms", default = "default_exhausted_retry_ms")]
    pub exhausted_retry_ms: u64,

    #[serde(rename = "on-exhausted", default)]
    pub on_exhausted: ExhaustedPolicy,
}

/// In-client retry policy for transient HTTP statuses
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
}

/// Request identity configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserAgentConfig {
    /// User-Agent strings rotated per request; empty means the built-in pool
    #[serde(default)]
    pub pool: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Optional file receiving a copy of every log line
    #[serde(rename = "log-file", default)]
    pub log_file: Option<String>,

    /// Interval of the progress log line (seconds, 0 disables)
    #[serde(
        rename = "progress-interval-secs",
        default = "default_progress_interval_secs"
    )]
    pub progress_interval_secs: u64,
}

/// A named target with its candidate endpoint base URLs
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Display name used in logs and statistics
    pub name: String,

    /// Candidate base URLs, tried at random
    pub endpoints: Vec<String>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_min_sleep_ms() -> u64 {
    500
}

fn default_max_sleep_ms() -> u64 {
    2000
}

fn default_rate_limit_delay_ms() -> u64 {
    5000
}

fn default_connect_timeout_delay_ms() -> u64 {
    2000
}

fn default_error_delay_ms() -> u64 {
    1000
}

fn default_exhausted_retry_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_progress_interval_secs() -> u64 {
    30
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers_per_site: None,
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: false,
            min_sleep_ms: default_min_sleep_ms(),
            max_sleep_ms: default_max_sleep_ms(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            connect_timeout_delay_ms: default_connect_timeout_delay_ms(),
            error_delay_ms: default_error_delay_ms(),
            exhausted_retry_ms: default_exhausted_retry_ms(),
            on_exhausted: ExhaustedPolicy::default(),
        }
    }
}

impl DispatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            progress_interval_secs: default_progress_interval_secs(),
        }
    }
}
