//! Sumi-Flow main entry point
//!
//! This is the command-line interface for the Sumi-Flow traffic generator.

use anyhow::Context;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sumi_flow::config::{
    load_config_with_hash, parse_worker_count, prompt_workers_per_site,
    resolve_workers_per_site, Config, WorkerCountSource,
};
use sumi_flow::dispatch::run;
use sumi_flow::output::print_statistics;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Sumi-Flow: a sustained HTTP traffic generator
///
/// Sumi-Flow keeps a pool of workers per configured site issuing requests
/// until interrupted, backing off on rate limits and pruning endpoints that
/// no longer resolve.
#[derive(Parser, Debug)]
#[command(name = "sumi-flow")]
#[command(version = "1.0.0")]
#[command(about = "A sustained HTTP traffic generator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Workers per site (1-20, anything else falls back to 5)
    #[arg(short, long, allow_hyphen_values = true)]
    workers: Option<String>,

    /// Ask for the number of workers per site on stdin
    #[arg(long, conflicts_with = "workers")]
    prompt: bool,

    /// Also write log lines to this file (overrides [output] log-file)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the dispatch plan without sending requests
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.output.log_file.as_ref().map(PathBuf::from));
    setup_logging(cli.verbose, cli.quiet, log_file.as_deref())?;

    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    let prompted = if cli.prompt {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        prompt_workers_per_site(&mut stdin.lock(), &mut stdout)?
    } else {
        None
    };

    let (workers_per_site, source) = resolve_workers_per_site(&[
        (
            WorkerCountSource::CommandLine,
            cli.workers.as_deref().map(parse_worker_count),
        ),
        (WorkerCountSource::Prompt, prompted),
        (
            WorkerCountSource::ConfigFile,
            config.dispatch.workers_per_site.map(Ok),
        ),
    ]);
    tracing::info!("Workers per site: {} ({})", workers_per_site, source);

    if cli.dry_run {
        handle_dry_run(&config, workers_per_site);
        return Ok(());
    }

    handle_dispatch(&config, workers_per_site).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Lines go to stdout and, when a log file is given, are appended to it
/// without ANSI colors.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_flow=info,warn"),
            1 => EnvFilter::new("sumi_flow=debug,info"),
            2 => EnvFilter::new("sumi_flow=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: shows what would be dispatched
fn handle_dry_run(config: &Config, workers_per_site: u32) {
    println!("=== Sumi-Flow Dry Run ===\n");

    println!("Dispatch Configuration:");
    println!("  Workers per site: {}", workers_per_site);
    println!(
        "  Request timeout: {}s",
        config.dispatch.request_timeout_secs
    );
    println!("  TLS verification: {}", config.dispatch.tls_verify);
    println!(
        "  Sleep between requests: {}-{}ms",
        config.dispatch.min_sleep_ms, config.dispatch.max_sleep_ms
    );
    println!(
        "  Rate limit delay: {}ms",
        config.dispatch.rate_limit_delay_ms
    );
    println!("  On exhausted site: {:?}", config.dispatch.on_exhausted);

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!("  Base delay: {}ms", config.retry.base_delay_ms);

    println!("\nUser Agents:");
    if config.user_agent.pool.is_empty() {
        println!("  Built-in pool");
    } else {
        println!("  {} configured", config.user_agent.pool.len());
    }

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({} endpoints)", site.name, site.endpoints.len());
        for endpoint in &site.endpoints {
            println!("    * {}", endpoint);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start {} workers",
        config.sites.len() * workers_per_site as usize
    );
}

/// Handles the main traffic run until Ctrl-C
async fn handle_dispatch(config: &Config, workers_per_site: u32) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping workers");
                signal_cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    tracing::info!(
        "Targets: {}",
        config
            .sites
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let (report, summary) = run(config, workers_per_site, cancel).await?;
    tracing::info!(
        "Stopped: {} workers cancelled, {} exhausted, {} failed",
        report.cancelled,
        report.exhausted,
        report.failed
    );

    print_statistics(&summary);
    tracing::info!("Shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumi_flow::config::DEFAULT_WORKERS_PER_SITE;

    #[test]
    fn test_unparsable_workers_flag_falls_back_to_default() {
        let cli = Cli::try_parse_from(["sumi-flow", "flow.toml", "--workers", "abc", "--dry-run"])
            .expect("non-numeric --workers must still parse");

        let resolved = resolve_workers_per_site(&[
            (
                WorkerCountSource::CommandLine,
                cli.workers.as_deref().map(parse_worker_count),
            ),
            (WorkerCountSource::ConfigFile, Some(Ok(8))),
        ]);

        assert_eq!(
            resolved,
            (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default)
        );
    }

    #[test]
    fn test_negative_workers_flag_is_accepted_then_rejected() {
        let cli = Cli::try_parse_from(["sumi-flow", "flow.toml", "-w", "-3"]).unwrap();
        assert_eq!(cli.workers.as_deref(), Some("-3"));
        assert_eq!(
            resolve_workers_per_site(&[(
                WorkerCountSource::CommandLine,
                cli.workers.as_deref().map(parse_worker_count),
            )]),
            (DEFAULT_WORKERS_PER_SITE, WorkerCountSource::Default)
        );
    }
}
