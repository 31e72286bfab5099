//! Sweep Statistics
//!
//! Per-unit counters reported when a cleaning unit finishes.

/// Outcome counters of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Scan steps that returned a batch
    pub batches: u64,

    /// Keys inspected, repeats included
    pub scanned: u64,

    /// Keys skipped because their TTL was still positive
    pub alive: u64,

    pub deleted: u64,

    /// Keys gone before they could be inspected or deleted
    pub missing: u64,

    pub ttl_errors: u64,
    pub delete_errors: u64,
    pub scan_errors: u64,

    /// The walk stopped early after repeated scan failures
    pub abandoned: bool,
}

impl SweepStats {
    /// Keys that were skipped because a request failed
    pub fn key_failures(&self) -> u64 {
        self.ttl_errors + self.delete_errors
    }
}
