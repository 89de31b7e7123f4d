use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request counter shared by all workers
///
/// The counter tags outgoing URLs and annotates log lines. It is created once
/// by the caller and handed to every worker; the increment is a single atomic
/// read-modify-write, so no network call ever runs under it.
#[derive(Debug, Default)]
pub struct RequestCounter {
    value: AtomicU64,
}

impl RequestCounter {
    /// Creates a counter starting at `start`
    pub fn new(start: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
        }
    }

    /// Increments by exactly one and returns the value that was replaced
    ///
    /// Concurrent callers each observe a distinct value and no value is skipped.
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst)
    }

    /// Reads the current value without incrementing
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}
