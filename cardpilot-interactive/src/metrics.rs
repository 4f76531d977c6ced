//! Metrics collection for monitoring authorization traffic.
//!
//! # Example
//!
//! ```rust
//! use cardpilot_interactive::metrics::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_request();
//! metrics.record_approval();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.approvals, 1);
//! ```

use cardpilot_lib::NoMatch;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for protocol outcomes.
///
/// Thread-safe via atomic operations.
#[derive(Debug)]
pub struct Metrics {
    // Requests
    requests_received: AtomicU64,
    malformed_rejected: AtomicU64,
    duplicates: AtomicU64,
    events_acknowledged: AtomicU64,

    // Decisions
    approvals: AtomicU64,
    declines_no_ranking_data: AtomicU64,
    declines_no_eligible_instrument: AtomicU64,
    declines_unconfigured_funding: AtomicU64,
    declines_deadline: AtomicU64,
    declines_engine_unavailable: AtomicU64,

    // Funding
    funding_successes: AtomicU64,
    funding_failures: AtomicU64,

    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            malformed_rejected: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            events_acknowledged: AtomicU64::new(0),
            approvals: AtomicU64::new(0),
            declines_no_ranking_data: AtomicU64::new(0),
            declines_no_eligible_instrument: AtomicU64::new(0),
            declines_unconfigured_funding: AtomicU64::new(0),
            declines_deadline: AtomicU64::new(0),
            declines_engine_unavailable: AtomicU64::new(0),
            funding_successes: AtomicU64::new(0),
            funding_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a well-formed request.
    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed request.
    pub fn record_malformed(&self) {
        self.malformed_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a duplicate delivery.
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an acknowledged non-authorization event.
    pub fn record_event_acknowledged(&self) {
        self.events_acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an approval.
    pub fn record_approval(&self) {
        self.approvals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decline caused by the selection engine.
    pub fn record_no_match(&self, no_match: &NoMatch) {
        let counter = match no_match {
            NoMatch::NoRankingData { .. } => &self.declines_no_ranking_data,
            NoMatch::NoEligibleInstrument { .. } => &self.declines_no_eligible_instrument,
            NoMatch::UnconfiguredFundingTarget { .. } => &self.declines_unconfigured_funding,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decline because the time budget expired.
    pub fn record_deadline_decline(&self) {
        self.declines_deadline.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decline because the selection task failed.
    pub fn record_engine_unavailable(&self) {
        self.declines_engine_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a confirmed funding charge.
    pub fn record_funding_success(&self) {
        self.funding_successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected funding charge.
    pub fn record_funding_failure(&self) {
        self.funding_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            requests_received: self.requests_received.load(Ordering::Relaxed),
            malformed_rejected: self.malformed_rejected.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            events_acknowledged: self.events_acknowledged.load(Ordering::Relaxed),
            approvals: self.approvals.load(Ordering::Relaxed),
            declines_no_ranking_data: self.declines_no_ranking_data.load(Ordering::Relaxed),
            declines_no_eligible_instrument: self
                .declines_no_eligible_instrument
                .load(Ordering::Relaxed),
            declines_unconfigured_funding: self.declines_unconfigured_funding.load(Ordering::Relaxed),
            declines_deadline: self.declines_deadline.load(Ordering::Relaxed),
            declines_engine_unavailable: self.declines_engine_unavailable.load(Ordering::Relaxed),
            funding_successes: self.funding_successes.load(Ordering::Relaxed),
            funding_failures: self.funding_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.requests_received,
            &self.malformed_rejected,
            &self.duplicates,
            &self.events_acknowledged,
            &self.approvals,
            &self.declines_no_ranking_data,
            &self.declines_no_eligible_instrument,
            &self.declines_unconfigured_funding,
            &self.declines_deadline,
            &self.declines_engine_unavailable,
            &self.funding_successes,
            &self.funding_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of all metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Uptime in seconds since the collector was created.
    pub uptime_secs: u64,

    /// Distinct request ids admitted; redeliveries count under `duplicates`.
    pub requests_received: u64,
    pub malformed_rejected: u64,
    pub duplicates: u64,
    pub events_acknowledged: u64,

    pub approvals: u64,
    pub declines_no_ranking_data: u64,
    pub declines_no_eligible_instrument: u64,
    pub declines_unconfigured_funding: u64,
    pub declines_deadline: u64,
    pub declines_engine_unavailable: u64,

    pub funding_successes: u64,
    pub funding_failures: u64,
}

impl MetricsSnapshot {
    /// All declines, whatever the cause.
    pub fn total_declines(&self) -> u64 {
        self.declines_no_ranking_data
            + self.declines_no_eligible_instrument
            + self.declines_unconfigured_funding
            + self.declines_deadline
            + self.declines_engine_unavailable
    }

    /// Approval rate over decided requests (0.0 to 1.0).
    pub fn approval_rate(&self) -> f64 {
        let decided = self.approvals + self.total_declines();
        if decided == 0 {
            return 0.0;
        }
        self.approvals as f64 / decided as f64
    }

    /// Format as JSON for logging/monitoring.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
