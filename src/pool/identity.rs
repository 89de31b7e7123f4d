use crate::config::UserAgentConfig;
use crate::FlowError;
use rand::seq::SliceRandom;

/// Built-in pool used when the configuration does not list any User-Agent
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Random User-Agent selection from a fixed, non-empty list
#[derive(Debug, Clone)]
pub struct IdentityRotator {
    agents: Vec<String>,
}

impl IdentityRotator {
    /// Creates a rotator over the given agents
    ///
    /// # Errors
    ///
    /// `FlowError::InvalidUserAgentPool` if the list is empty or only holds blanks
    pub fn new(agents: Vec<String>) -> Result<Self, FlowError> {
        let agents: Vec<String> = agents
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        if agents.is_empty() {
            return Err(FlowError::InvalidUserAgentPool);
        }

        Ok(Self { agents })
    }

    /// Builds the rotator from configuration, falling back to [`DEFAULT_USER_AGENTS`]
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, FlowError> {
        if config.pool.is_empty() {
            Self::new(DEFAULT_USER_AGENTS.iter().map(|a| a.to_string()).collect())
        } else {
            Self::new(config.pool.clone())
        }
    }

    /// Picks a User-Agent uniformly at random
    pub fn pick(&self) -> &str {
        // The constructor rejects empty pools
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            IdentityRotator::new(vec![]),
            Err(FlowError::InvalidUserAgentPool)
        ));
        assert!(IdentityRotator::new(vec!["   ".to_string()]).is_err());
    }

    #[test]
    fn test_pick_from_configured_pool() {
        let rotator =
            IdentityRotator::new(vec!["AgentOne/1.0".to_string(), "AgentTwo/2.0".to_string()])
                .unwrap();

        let seen: HashSet<&str> = (0..200).map(|_| rotator.pick()).collect();
        assert_eq!(seen, HashSet::from(["AgentOne/1.0", "AgentTwo/2.0"]));
    }

    #[test]
    fn test_from_config_uses_default_pool() {
        let rotator = IdentityRotator::from_config(&UserAgentConfig::default()).unwrap();
        assert_eq!(rotator.len(), DEFAULT_USER_AGENTS.len());
        assert!(DEFAULT_USER_AGENTS.contains(&rotator.pick()));
    }

    #[test]
    fn test_from_config_uses_configured_pool() {
        let config = UserAgentConfig {
            pool: vec!["Custom/1.0".to_string()],
        };
        let rotator = IdentityRotator::from_config(&config).unwrap();
        assert_eq!(rotator.pick(), "Custom/1.0");
    }
}
