use crate::config::types::{Config, DispatchConfig, RetryConfig, SiteEntry, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_dispatch_config(&config.dispatch)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates worker loop timings
///
/// `workers-per-site` is deliberately not checked here: an out-of-range value
/// falls back to the default at resolution time instead of rejecting the file.
fn validate_dispatch_config(config: &DispatchConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.min_sleep_ms > config.max_sleep_ms {
        return Err(ConfigError::Validation(format!(
            "min_sleep_ms ({}) must not exceed max_sleep_ms ({})",
            config.min_sleep_ms, config.max_sleep_ms
        )));
    }

    if config.exhausted_retry_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "exhausted_retry_ms must be >= 100ms, got {}ms",
            config.exhausted_retry_ms
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and 10, got {}",
            config.max_retries
        )));
    }
    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.pool.iter().any(|agent| agent.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agent pool entries cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the site table
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[site]] entry is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Site name cannot be empty".to_string(),
            ));
        }

        if !names.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate site name '{}'",
                site.name
            )));
        }

        if site.endpoints.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have at least one endpoint",
                site.name
            )));
        }

        let mut seen = HashSet::new();
        for endpoint in &site.endpoints {
            validate_endpoint(&site.name, endpoint)?;
            if !seen.insert(endpoint.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Site '{}' lists endpoint '{}' more than once",
                    site.name, endpoint
                )));
            }
        }
    }

    Ok(())
}

/// Validates a single endpoint base URL
fn validate_endpoint(site: &str, endpoint: &str) -> Result<(), ConfigError> {
    let url = Url::parse(endpoint).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid endpoint '{}' for site '{}': {}",
            endpoint, site, e
        ))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' for site '{}' must use http or https",
            endpoint, site
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' for site '{}' has no host",
            endpoint, site
        )));
    }

    if url.fragment().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' for site '{}' cannot carry a fragment",
            endpoint, site
        )));
    }

    Ok(())
}
