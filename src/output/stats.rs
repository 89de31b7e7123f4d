//! Session statistics
//!
//! Workers record every classified outcome into a per-site tally. The tallies
//! are read for the periodic progress line and the shutdown summary.

use crate::dispatch::Outcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live per-site outcome tally, updated concurrently by the site's workers
#[derive(Debug, Default)]
pub struct SiteStats {
    responses: AtomicU64,
    rate_limited: AtomicU64,
    tls_failures: AtomicU64,
    connect_timeouts: AtomicU64,
    read_timeouts: AtomicU64,
    name_resolution_failures: AtomicU64,
    other_errors: AtomicU64,
    endpoints_removed: AtomicU64,
    exhausted_polls: AtomicU64,
    status_counts: std::sync::Mutex<BTreeMap<u16, u64>>,
}

impl SiteStats {
    /// Records one classified outcome
    pub fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Success(status) => {
                self.record_status(*status);
                &self.responses
            }
            Outcome::RateLimited => {
                self.record_status(429);
                &self.rate_limited
            }
            Outcome::TlsFailure => &self.tls_failures,
            Outcome::ConnectTimeout => &self.connect_timeouts,
            Outcome::ReadTimeout => &self.read_timeouts,
            Outcome::NameResolutionFailure => &self.name_resolution_failures,
            Outcome::OtherTransportError => &self.other_errors,
            Outcome::Interrupted => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records that an endpoint was pruned from the site
    pub fn record_removal(&self) {
        self.endpoints_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a selection attempt on an exhausted pool
    pub fn record_exhausted(&self) {
        self.exhausted_polls.fetch_add(1, Ordering::Relaxed);
    }

    fn record_status(&self, status: u16) {
        let mut counts = self
            .status_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *counts.entry(status).or_insert(0) += 1;
    }

    /// Point-in-time copy of the tally
    pub fn snapshot(&self, site: &str, endpoints_remaining: usize) -> SiteSnapshot {
        let status_counts = self
            .status_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        SiteSnapshot {
            site: site.to_string(),
            responses: self.responses.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            tls_failures: self.tls_failures.load(Ordering::Relaxed),
            connect_timeouts: self.connect_timeouts.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
            name_resolution_failures: self.name_resolution_failures.load(Ordering::Relaxed),
            other_errors: self.other_errors.load(Ordering::Relaxed),
            endpoints_removed: self.endpoints_removed.load(Ordering::Relaxed),
            endpoints_remaining,
            exhausted_polls: self.exhausted_polls.load(Ordering::Relaxed),
            status_counts,
        }
    }
}

/// Frozen per-site tally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSnapshot {
    pub site: String,

    /// Responses other than a surfaced 429
    pub responses: u64,

    pub rate_limited: u64,
    pub tls_failures: u64,
    pub connect_timeouts: u64,
    pub read_timeouts: u64,
    pub name_resolution_failures: u64,
    pub other_errors: u64,
    pub endpoints_removed: u64,
    pub endpoints_remaining: usize,
    pub exhausted_polls: u64,

    /// Responses by HTTP status
    pub status_counts: BTreeMap<u16, u64>,
}

impl SiteSnapshot {
    /// Requests that produced an HTTP response
    pub fn total_responses(&self) -> u64 {
        self.responses + self.rate_limited
    }

    /// Requests that failed at the transport level
    pub fn total_errors(&self) -> u64 {
        self.tls_failures
            + self.connect_timeouts
            + self.read_timeouts
            + self.name_resolution_failures
            + self.other_errors
    }

    pub fn total_requests(&self) -> u64 {
        self.total_responses() + self.total_errors()
    }
}

/// Session-wide statistics, one tally per site
#[derive(Debug)]
pub struct SessionStats {
    started_at: DateTime<Utc>,
    sites: Vec<(String, Arc<SiteStats>)>,
}

impl SessionStats {
    /// Creates empty tallies for the given site names
    pub fn new<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            started_at: Utc::now(),
            sites: sites
                .into_iter()
                .map(|name| (name.into(), Arc::new(SiteStats::default())))
                .collect(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Tally for a site
    pub fn site(&self, name: &str) -> Option<Arc<SiteStats>> {
        self.sites
            .iter()
            .find(|(site, _)| site == name)
            .map(|(_, stats)| stats.clone())
    }

    /// Builds a summary, given the number of endpoints left per site
    pub fn summary<F>(&self, endpoints_remaining: F) -> SessionSummary
    where
        F: Fn(&str) -> usize,
    {
        let finished_at = Utc::now();
        SessionSummary {
            started_at: self.started_at,
            duration_seconds: (finished_at - self.started_at).num_seconds().max(0) as u64,
            sites: self
                .sites
                .iter()
                .map(|(site, stats)| stats.snapshot(site, endpoints_remaining(site)))
                .collect(),
        }
    }
}

/// Frozen session statistics
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub sites: Vec<SiteSnapshot>,
}

impl SessionSummary {
    pub fn total_requests(&self) -> u64 {
        self.sites.iter().map(SiteSnapshot::total_requests).sum()
    }

    pub fn total_responses(&self) -> u64 {
        self.sites.iter().map(SiteSnapshot::total_responses).sum()
    }

    /// Compact one-line form used for the periodic progress log
    pub fn progress_line(&self) -> String {
        let rate = if self.duration_seconds > 0 {
            self.total_requests() as f64 / self.duration_seconds as f64
        } else {
            0.0
        };
        format!(
            "Progress: {} requests ({} responses, {} errors) in {}s, {:.2} req/sec",
            self.total_requests(),
            self.total_responses(),
            self.total_requests() - self.total_responses(),
            self.duration_seconds,
            rate
        )
    }
}

/// Prints the session summary to stdout in a formatted manner
pub fn print_statistics(summary: &SessionSummary) {
    println!("=== Session Statistics ===\n");

    println!("Overview:");
    println!(
        "  Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Duration: {}s", summary.duration_seconds);
    println!("  Total requests: {}", summary.total_requests());
    println!("  Responses received: {}", summary.total_responses());
    println!();

    for site in &summary.sites {
        println!("Site: {}", site.site);
        println!(
            "  Requests: {} ({} responses, {} errors)",
            site.total_requests(),
            site.total_responses(),
            site.total_errors()
        );

        if !site.status_counts.is_empty() {
            let statuses: Vec<String> = site
                .status_counts
                .iter()
                .map(|(status, count)| format!("{}×{}", status, count))
                .collect();
            println!("  Statuses: {}", statuses.join(", "));
        }

        if site.total_errors() > 0 {
            println!("  TLS failures: {}", site.tls_failures);
            println!("  Connect timeouts: {}", site.connect_timeouts);
            println!("  Read timeouts: {}", site.read_timeouts);
            println!(
                "  Name resolution failures: {}",
                site.name_resolution_failures
            );
            println!("  Other transport errors: {}", site.other_errors);
        }

        println!(
            "  Endpoints: {} remaining, {} removed",
            site.endpoints_remaining, site.endpoints_removed
        );
        if site.endpoints_remaining == 0 {
            println!("  Site exhausted ({} idle polls)", site.exhausted_polls);
        }
        println!();
    }

    let success_rate = if summary.total_requests() > 0 {
        (summary.total_responses() as f64 / summary.total_requests() as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Response Rate: {:.1}% ({} / {} requests answered)",
        success_rate,
        summary.total_responses(),
        summary.total_requests()
    );
}
