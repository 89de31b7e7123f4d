//! Per-(site, slot) request loop
//!
//! Each iteration walks `SelectEndpoint → BuildRequest → Execute → Classify →
//! (Record | Backoff | PruneEndpoint) → Sleep`. No outcome is fatal; the loop
//! only ends on cancellation, or on pool exhaustion when the site is configured
//! to exit.

use crate::client::{OutgoingRequest, Transport};
use crate::config::ExhaustedPolicy;
use crate::dispatch::{Outcome, Pacing};
use crate::output::SiteStats;
use crate::pool::{EndpointPool, IdentityRotator, RequestCounter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Identity of a worker: its site and slot number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId {
    pub site: String,
    pub slot: u32,
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.site, self.slot)
    }
}

/// Request settings shared by every worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub timeout: Duration,
    pub tls_verify: bool,
    pub pacing: Pacing,
    pub on_exhausted: ExhaustedPolicy,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            tls_verify: false,
            pacing: Pacing::default(),
            on_exhausted: ExhaustedPolicy::Idle,
        }
    }
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Cancellation was observed
    Cancelled,

    /// Every endpoint of the site was pruned and the site is set to exit
    Exhausted,
}

/// What the loop does after one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep for the duration, then run the next iteration
    Continue(Duration),
    Exit(WorkerExit),
}

/// One request loop bound to a single site
pub struct Worker {
    id: WorkerId,
    pool: Arc<EndpointPool>,
    counter: Arc<RequestCounter>,
    identity: Arc<IdentityRotator>,
    transport: Arc<dyn Transport>,
    stats: Arc<SiteStats>,
    settings: WorkerSettings,
    rng: StdRng,

    /// Set once the empty-pool warning has been logged
    exhausted_reported: bool,
}

impl Worker {
    /// Creates a worker
    ///
    /// # Arguments
    ///
    /// * `id` - Site and slot this worker serves
    /// * `pool` - The site's endpoint pool, shared with its other workers
    /// * `counter` - Process-wide request counter
    /// * `identity` - User-Agent rotator
    /// * `transport` - Shared HTTP transport
    /// * `stats` - The site's outcome tally
    /// * `settings` - Timeouts, pacing and exhaustion policy
    pub fn new(
        id: WorkerId,
        pool: Arc<EndpointPool>,
        counter: Arc<RequestCounter>,
        identity: Arc<IdentityRotator>,
        transport: Arc<dyn Transport>,
        stats: Arc<SiteStats>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            id,
            pool,
            counter,
            identity,
            transport,
            stats,
            settings,
            rng: StdRng::from_entropy(),
            exhausted_reported: false,
        }
    }

    /// Replaces the random source used for endpoint selection and jitter
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Runs the loop until cancellation (or exhaustion, if configured)
    ///
    /// Cancellation is checked at the top of every iteration and raced
    /// against both the network call and the sleep.
    pub async fn run(mut self, cancel: CancellationToken) -> WorkerExit {
        tracing::debug!("Worker {} started", self.id);

        let exit = loop {
            if cancel.is_cancelled() {
                break WorkerExit::Cancelled;
            }

            match self.iterate(&cancel).await {
                Step::Exit(exit) => break exit,
                Step::Continue(delay) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break WorkerExit::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        tracing::debug!("Worker {} stopped: {:?}", self.id, exit);
        exit
    }

    /// Runs a single iteration, without the trailing sleep
    pub async fn iterate(&mut self, cancel: &CancellationToken) -> Step {
        // SelectEndpoint
        let endpoint = match self.pool.pick_with(&mut self.rng) {
            Ok(endpoint) => {
                self.exhausted_reported = false;
                endpoint
            }
            Err(err) => return self.on_exhausted(err),
        };

        // BuildRequest: tag with the current value, the counter only moves on a response
        let request = OutgoingRequest::new(
            &endpoint,
            self.counter.current(),
            self.identity.pick(),
            self.settings.timeout,
            self.settings.tls_verify,
        );
        tracing::trace!("Requesting {} as '{}'", request.url, request.user_agent);

        // Execute
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.transport.get(&request) => Some(result),
        };

        // Classify
        let outcome = match &result {
            Some(result) => Outcome::classify(result),
            None => Outcome::Interrupted,
        };
        self.stats.record(&outcome);

        if outcome == Outcome::Interrupted {
            tracing::info!("Cancelled while requesting {}", request.url);
            return Step::Exit(WorkerExit::Cancelled);
        }

        let detail = match &result {
            Some(Err(err)) => err.to_string(),
            _ => outcome.to_string(),
        };

        if outcome.is_response() {
            let count = self.counter.next();
            if outcome.is_rate_limited() {
                tracing::warn!(
                    "[{}] {} {} still rate limited (429) after retries, backing off",
                    count,
                    self.id.site,
                    request.url
                );
            } else {
                tracing::info!("[{}] {} {} {}", count, self.id.site, request.url, detail);
            }
        } else if outcome.prunes_endpoint() {
            tracing::error!("{} {} failed: {}", self.id.site, request.url, detail);
            self.prune(&endpoint);
        } else if outcome.is_error() {
            tracing::warn!("{} {} failed: {}", self.id.site, request.url, detail);
        }

        // Sleep
        match self.settings.pacing.sleep_after(&outcome, &mut self.rng) {
            Some(delay) => Step::Continue(delay),
            None => Step::Exit(WorkerExit::Cancelled),
        }
    }

    /// Removes an unresolvable endpoint from the site
    fn prune(&self, endpoint: &str) {
        if self.pool.remove(endpoint) {
            self.stats.record_removal();
            tracing::warn!(
                "Removed endpoint {} from site {} ({} remaining)",
                endpoint,
                self.id.site,
                self.pool.len()
            );
        } else {
            tracing::debug!("Endpoint {} was already removed", endpoint);
        }
    }

    fn on_exhausted(&mut self, err: crate::EmptyPoolError) -> Step {
        self.stats.record_exhausted();

        if self.settings.on_exhausted == ExhaustedPolicy::Exit {
            tracing::warn!("{}, worker {} exiting", err, self.id);
            return Step::Exit(WorkerExit::Exhausted);
        }

        if self.exhausted_reported {
            tracing::debug!("{}, retrying", err);
        } else {
            tracing::warn!(
                "{}, retrying every {:?}",
                err,
                self.settings.pacing.exhausted_retry
            );
            self.exhausted_reported = true;
        }
        Step::Continue(self.settings.pacing.exhausted_retry)
    }
}
