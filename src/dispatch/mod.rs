//! Concurrent dispatch engine
//!
//! This module contains the core traffic loop, including:
//! - Outcome classification of every request
//! - Backoff and jitter between iterations
//! - The per-(site, slot) worker state machine
//! - Worker lifecycle under a single cancellation token

mod dispatcher;
mod outcome;
mod pacing;
mod worker;

pub use dispatcher::{DispatchHandle, DispatchReport, Dispatcher};
pub use outcome::Outcome;
pub use pacing::Pacing;
pub use worker::{Step, Worker, WorkerExit, WorkerId, WorkerSettings};

use crate::config::Config;
use crate::FlowError;
use tokio_util::sync::CancellationToken;

/// Runs the dispatch until `cancel` fires (or every worker exits)
///
/// This is the main entry point for a traffic run. It will:
/// 1. Build the shared HTTP client, counter and identity rotator
/// 2. Create one endpoint pool per site
/// 3. Start `workers_per_site × sites` workers
/// 4. Wait for them to stop and return the session summary
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `workers_per_site` - Resolved worker count per site
/// * `cancel` - Token stopping the run
///
/// # Returns
///
/// * `Ok((DispatchReport, SessionSummary))` - The run ended
/// * `Err(FlowError)` - The shared client could not be built
pub async fn run(
    config: &Config,
    workers_per_site: u32,
    cancel: CancellationToken,
) -> Result<(DispatchReport, crate::output::SessionSummary), FlowError> {
    let dispatcher = Dispatcher::from_config(config, workers_per_site)?;
    let handle = dispatcher.spawn(cancel);
    let report = handle.wait().await;
    Ok((report, dispatcher.summary()))
}
