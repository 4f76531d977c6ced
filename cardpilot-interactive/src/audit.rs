//! Append-only audit log of protocol events.
//!
//! Events are never edited. A funding failure is a new event next to the
//! approval it follows, so the approval stays visible as issued. Old events
//! leave the log only through [`AuditLog::cleanup_before`], and sequence
//! numbers are never reused.

use crate::DecisionReason;
use cardpilot_lib::{FundingTargetId, InstrumentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// What happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A request arrived.
    Received {
        /// Merchant category code.
        mcc: String,
        /// Amount in minor units.
        amount_minor_units: u64,
    },
    /// A decision was produced.
    Decided {
        /// Approve or decline.
        approved: bool,
        /// Why.
        reason: DecisionReason,
        /// Chosen instrument, on approval.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instrument: Option<InstrumentId>,
    },
    /// A repeated delivery was answered without re-deciding.
    DuplicateAcknowledged {
        /// Whether the original was still being decided.
        in_flight: bool,
    },
    /// A malformed request was rejected before any side effect.
    MalformedRejected {
        /// Offending field.
        field: String,
    },
    /// A funding charge was dispatched.
    FundingPending {
        /// Account being charged.
        funding_target: FundingTargetId,
        /// Amount in minor units.
        amount_minor_units: u64,
    },
    /// The rail confirmed the charge.
    FundingSucceeded {
        /// Rail charge id.
        charge_id: String,
    },
    /// The rail rejected the charge after the approval was issued.
    FundingFailed {
        /// Rail or transport error.
        error: String,
    },
}

/// One audit log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the log, starting at 0. Gaps appear after cleanup.
    pub sequence: u64,
    /// Request the event belongs to.
    pub request_id: String,
    /// When it was recorded.
    pub at: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

#[derive(Debug, Default)]
struct Entries {
    events: Vec<AuditEvent>,
    next_sequence: u64,
}

/// Append-only, thread-safe event log.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Entries>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn append(&self, request_id: &str, kind: AuditEventKind) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let sequence = entries.next_sequence;
        entries.next_sequence += 1;
        entries.events.push(AuditEvent {
            sequence,
            request_id: request_id.to_string(),
            at: Utc::now(),
            kind,
        });
    }

    /// Drop events recorded before `before` (Unix seconds), except those of
    /// requests for which `keep` returns true. Returns how many were removed.
    pub fn cleanup_before<F>(&self, before: i64, keep: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let tracked = entries.events.len();
        entries
            .events
            .retain(|e| e.at.timestamp() >= before || keep(&e.request_id));
        tracked - entries.events.len()
    }

    /// Copy of every event, in order.
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .clone()
    }

    /// Events for one request, in order.
    pub fn for_request(&self, request_id: &str) -> Vec<AuditEvent> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
