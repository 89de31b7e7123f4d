//! Worker lifecycle management
//!
//! The dispatcher creates one worker per (site, slot) pair and owns the tasks
//! that run them. It never looks at outcomes; starting, cancelling and joining
//! workers is all it does.

use crate::client::{HttpClient, Transport};
use crate::config::{Config, SiteEntry};
use crate::dispatch::worker::{Worker, WorkerExit, WorkerId, WorkerSettings};
use crate::dispatch::Pacing;
use crate::output::{SessionStats, SessionSummary};
use crate::pool::{EndpointPool, IdentityRotator, RequestCounter};
use crate::FlowError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Owns the shared state and spawns the worker pool
pub struct Dispatcher {
    /// One pool per site, in configuration order
    pools: Vec<Arc<EndpointPool>>,

    workers_per_site: u32,
    counter: Arc<RequestCounter>,
    identity: Arc<IdentityRotator>,
    transport: Arc<dyn Transport>,
    stats: Arc<SessionStats>,
    settings: WorkerSettings,

    /// Interval of the progress log line, `None` disables it
    progress_interval: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given site table
    ///
    /// Each site gets its own in-memory endpoint pool; the site table itself
    /// is never modified.
    pub fn new(
        sites: &[SiteEntry],
        workers_per_site: u32,
        transport: Arc<dyn Transport>,
        counter: Arc<RequestCounter>,
        identity: Arc<IdentityRotator>,
        settings: WorkerSettings,
    ) -> Self {
        let pools: Vec<Arc<EndpointPool>> = sites
            .iter()
            .map(|site| {
                Arc::new(EndpointPool::new(
                    site.name.clone(),
                    site.endpoints.iter().cloned(),
                ))
            })
            .collect();
        let stats = Arc::new(SessionStats::new(sites.iter().map(|s| s.name.clone())));

        Self {
            pools,
            workers_per_site,
            counter,
            identity,
            transport,
            stats,
            settings,
            progress_interval: None,
        }
    }

    /// Builds a dispatcher with the reqwest transport and settings from `config`
    ///
    /// # Errors
    ///
    /// * `FlowError::Http` - The HTTP client could not be built
    /// * `FlowError::InvalidUserAgentPool` - The configured pool is unusable
    pub fn from_config(config: &Config, workers_per_site: u32) -> Result<Self, FlowError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpClient::from_config(config)?);
        let identity = Arc::new(IdentityRotator::from_config(&config.user_agent)?);
        let settings = WorkerSettings {
            timeout: config.dispatch.request_timeout(),
            tls_verify: config.dispatch.tls_verify,
            pacing: Pacing::from_config(&config.dispatch),
            on_exhausted: config.dispatch.on_exhausted,
        };

        let interval = config.output.progress_interval_secs;
        let dispatcher = Self::new(
            &config.sites,
            workers_per_site,
            transport,
            Arc::new(RequestCounter::new(0)),
            identity,
            settings,
        );

        Ok(if interval > 0 {
            dispatcher.with_progress_interval(Duration::from_secs(interval))
        } else {
            dispatcher
        })
    }

    /// Enables the periodic progress log line
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Number of workers `spawn` will start
    pub fn total_workers(&self) -> usize {
        self.pools.len() * self.workers_per_site as usize
    }

    pub fn workers_per_site(&self) -> u32 {
        self.workers_per_site
    }

    pub fn pools(&self) -> &[Arc<EndpointPool>] {
        &self.pools
    }

    pub fn counter(&self) -> Arc<RequestCounter> {
        self.counter.clone()
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }

    /// Snapshot of the session statistics, including endpoints left per site
    pub fn summary(&self) -> SessionSummary {
        summarize(&self.stats, &self.pools)
    }

    /// Starts every worker
    ///
    /// Workers run under a semaphore holding exactly `total_workers()` permits,
    /// so none of them ever queues. Cancelling `cancel` stops them all.
    pub fn spawn(&self, cancel: CancellationToken) -> DispatchHandle {
        let total = self.total_workers();
        let semaphore = Arc::new(Semaphore::new(total));
        let mut tasks = JoinSet::new();
        let mut assignments = Vec::with_capacity(total);

        for pool in &self.pools {
            let site = pool.site().to_string();
            tracing::info!(
                "Site {}: {} workers over {} endpoints",
                site,
                self.workers_per_site,
                pool.len()
            );

            let Some(site_stats) = self.stats.site(&site) else {
                continue;
            };

            for slot in 0..self.workers_per_site {
                let id = WorkerId {
                    site: site.clone(),
                    slot,
                };
                let worker = Worker::new(
                    id.clone(),
                    pool.clone(),
                    self.counter.clone(),
                    self.identity.clone(),
                    self.transport.clone(),
                    site_stats.clone(),
                    self.settings,
                );

                let span = tracing::info_span!("worker", site = %id.site, slot = id.slot);
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();
                let task_id = id.clone();
                tasks.spawn(
                    async move {
                        let Ok(_permit) = semaphore.acquire_owned().await else {
                            return (task_id, WorkerExit::Cancelled);
                        };
                        (task_id, worker.run(cancel).await)
                    }
                    .instrument(span),
                );
                assignments.push(id);
            }
        }

        tracing::info!("Started {} workers across {} sites", total, self.pools.len());

        let reporter_cancel = cancel.child_token();
        let reporter = self.progress_interval.map(|interval| {
            tokio::spawn(report_progress(
                self.stats.clone(),
                self.pools.clone(),
                interval,
                reporter_cancel.clone(),
            ))
        });

        DispatchHandle {
            cancel,
            reporter_cancel,
            tasks,
            assignments,
            reporter,
        }
    }
}

/// Running worker pool
pub struct DispatchHandle {
    cancel: CancellationToken,
    reporter_cancel: CancellationToken,
    tasks: JoinSet<(WorkerId, WorkerExit)>,
    assignments: Vec<WorkerId>,
    reporter: Option<JoinHandle<()>>,
}

/// How the workers of a dispatch ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Workers that observed cancellation
    pub cancelled: usize,

    /// Workers that stopped because their site ran out of endpoints
    pub exhausted: usize,

    /// Workers whose task panicked or was aborted
    pub failed: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.cancelled + self.exhausted + self.failed
    }
}

impl DispatchHandle {
    /// The (site, slot) pair of every started worker
    pub fn assignments(&self) -> &[WorkerId] {
        &self.assignments
    }

    /// Token that stops every worker of this dispatch
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for every worker to stop, without requesting it
    pub async fn wait(mut self) -> DispatchReport {
        let mut report = DispatchReport::default();

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((_, WorkerExit::Cancelled)) => report.cancelled += 1,
                Ok((id, WorkerExit::Exhausted)) => {
                    tracing::debug!("Worker {} exhausted", id);
                    report.exhausted += 1;
                }
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        self.reporter_cancel.cancel();
        if let Some(reporter) = self.reporter.take() {
            let _ = reporter.await;
        }

        report
    }

    /// Cancels every worker and waits for them to stop
    pub async fn shutdown(self) -> DispatchReport {
        self.cancel.cancel();
        self.wait().await
    }
}

fn summarize(stats: &SessionStats, pools: &[Arc<EndpointPool>]) -> SessionSummary {
    stats.summary(|site| {
        pools
            .iter()
            .find(|pool| pool.site() == site)
            .map(|pool| pool.len())
            .unwrap_or(0)
    })
}

/// Logs a progress line every `interval` until cancelled
async fn report_progress(
    stats: Arc<SessionStats>,
    pools: Vec<Arc<EndpointPool>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tracing::info!("{}", summarize(&stats, &pools).progress_line());
            }
        }
    }
}
