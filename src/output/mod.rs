//! Output module for session reporting
//!
//! This module handles:
//! - Per-site outcome tallies recorded by workers
//! - The periodic progress line
//! - The session summary printed at shutdown

pub mod stats;

pub use stats::{print_statistics, SessionStats, SessionSummary, SiteSnapshot, SiteStats};
