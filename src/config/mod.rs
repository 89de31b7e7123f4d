//! Configuration module for Sumi-Flow
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving the workers-per-site setting from its possible sources.
//!
//! # Example
//!
//! ```no_run
//! use sumi_flow::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sumi-flow.toml")).unwrap();
//! println!("Dispatching to {} sites", config.sites.len());
//! ```

mod parser;
mod types;
mod validation;
mod workers;

// Re-export types
pub use types::{
    Config, DispatchConfig, ExhaustedPolicy, OutputConfig, RetryConfig, SiteEntry,
    UserAgentConfig, DEFAULT_WORKERS_PER_SITE, WORKERS_PER_SITE_RANGE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use workers::{
    parse_worker_count, prompt_workers_per_site, resolve_workers_per_site, WorkerCountInput,
    WorkerCountSource,
};
