//! Sumi-Flow: a sustained, concurrent HTTP traffic generator
//!
//! This crate keeps a fixed pool of workers per configured site issuing requests
//! continuously, classifying every transport failure, backing off on rate limits
//! and pruning endpoints that can no longer be resolved.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod output;
pub mod pool;

use thiserror::Error;

/// Main error type for Sumi-Flow operations
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("User agent pool must contain at least one non-empty entry")]
    InvalidUserAgentPool,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Raised when a site has no endpoints left to pick from
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No endpoints remain for site '{site}'")]
pub struct EmptyPoolError {
    pub site: String,
}

/// Result type alias for Sumi-Flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use client::{HttpClient, Transport, TransportError};
pub use config::Config;
pub use dispatch::{DispatchHandle, Dispatcher, Outcome, Worker, WorkerId};
pub use pool::{EndpointPool, IdentityRotator, RequestCounter};
