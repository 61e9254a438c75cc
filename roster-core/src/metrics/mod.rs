//! Metrics for gateway calls and membership synchronization
//!
//! Uses the `metrics` facade; installing an exporter is left to the host
//! application.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const RPC_CALLS_TOTAL: &str = "rpc.calls.total";
pub const RPC_CALLS_FAILED: &str = "rpc.calls.failed";
pub const RPC_CALL_DURATION_MS: &str = "rpc.call.duration_ms";
pub const SYNC_EVENTS_APPLIED: &str = "sync.events.applied";
pub const SYNC_EVENTS_IGNORED: &str = "sync.events.ignored";
pub const SYNC_REFRESHES: &str = "sync.refreshes";
pub const MUTE_DENIED: &str = "contact.mute.denied";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(RPC_CALLS_TOTAL, "Total gateway requests issued");
    describe_counter!(RPC_CALLS_FAILED, "Gateway requests that failed or timed out");
    describe_histogram!(RPC_CALL_DURATION_MS, "Gateway request duration in milliseconds");
    describe_counter!(SYNC_EVENTS_APPLIED, "Push events applied to a group snapshot");
    describe_counter!(SYNC_EVENTS_IGNORED, "Push events rejected by a synchronizer");
    describe_counter!(SYNC_REFRESHES, "Full snapshot refreshes after the bus lagged");
    describe_counter!(MUTE_DENIED, "Mute attempts denied by the permission hierarchy");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}
