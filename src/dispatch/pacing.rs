//! Delays applied between worker iterations

use crate::config::DispatchConfig;
use crate::dispatch::Outcome;
use rand::Rng;
use std::time::Duration;

/// Backoff and jitter settings for the worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min_sleep: Duration,
    pub max_sleep: Duration,
    pub rate_limit_delay: Duration,
    pub connect_timeout_delay: Duration,
    pub error_delay: Duration,
    pub exhausted_retry: Duration,
}

impl Pacing {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            min_sleep: Duration::from_millis(config.min_sleep_ms),
            max_sleep: Duration::from_millis(config.max_sleep_ms),
            rate_limit_delay: Duration::from_millis(config.rate_limit_delay_ms),
            connect_timeout_delay: Duration::from_millis(config.connect_timeout_delay_ms),
            error_delay: Duration::from_millis(config.error_delay_ms),
            exhausted_retry: Duration::from_millis(config.exhausted_retry_ms),
        }
    }

    /// Extra delay owed to an outcome before the regular sleep
    ///
    /// | Outcome | Backoff |
    /// |---------|---------|
    /// | 429 (either form) | rate_limit_delay |
    /// | ConnectTimeout | connect_timeout_delay |
    /// | TLS / ReadTimeout / other | error_delay |
    /// | Success, NameResolutionFailure, Interrupted | none |
    pub fn backoff(&self, outcome: &Outcome) -> Duration {
        match outcome {
            o if o.is_rate_limited() => self.rate_limit_delay,
            Outcome::ConnectTimeout => self.connect_timeout_delay,
            Outcome::TlsFailure | Outcome::ReadTimeout | Outcome::OtherTransportError => {
                self.error_delay
            }
            _ => Duration::ZERO,
        }
    }

    /// Random inter-request sleep in `[min_sleep, max_sleep]`
    pub fn jitter<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.min_sleep >= self.max_sleep {
            return self.min_sleep;
        }
        rng.gen_range(self.min_sleep..=self.max_sleep)
    }

    /// Full sleep after an outcome, `None` when the worker should stop
    pub fn sleep_after<R: Rng>(&self, outcome: &Outcome, rng: &mut R) -> Option<Duration> {
        if matches!(outcome, Outcome::Interrupted) {
            return None;
        }
        Some(self.backoff(outcome) + self.jitter(rng))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}
