//! Request ledger for at-most-once processing.
//!
//! Tracks every request id the manager has admitted. A request is either
//! still being decided or has a recorded decision; repeated deliveries are
//! answered from the ledger. Decided entries are dropped once they fall
//! out of the retention window; in-flight entries are always kept.

use crate::{AuthorizationDecision, InteractiveError, Result};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Clone, Debug)]
enum Entry {
    InFlight,
    Decided(AuthorizationDecision),
}

/// Outcome of admitting a request id.
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    /// First delivery: decide it.
    Fresh,
    /// An earlier delivery is still being decided.
    InFlight,
    /// Already decided.
    Decided(AuthorizationDecision),
}

/// Thread-safe request id ledger.
#[derive(Debug, Default)]
pub struct RequestLedger {
    entries: RwLock<HashMap<String, Entry>>,
}

impl RequestLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a request id and mark it in flight if unseen.
    ///
    /// Check and mark happen under one write lock, so two concurrent
    /// deliveries of the same id cannot both be admitted as fresh.
    pub fn admit(&self, request_id: &str) -> Result<Admission> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| InteractiveError::Internal(format!("Lock poisoned: {}", e)))?;

        match entries.get(request_id) {
            Some(Entry::InFlight) => Ok(Admission::InFlight),
            Some(Entry::Decided(decision)) => Ok(Admission::Decided(decision.clone())),
            None => {
                entries.insert(request_id.to_string(), Entry::InFlight);
                Ok(Admission::Fresh)
            }
        }
    }

    /// Record the decision for an admitted request.
    pub fn record(&self, decision: &AuthorizationDecision) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| InteractiveError::Internal(format!("Lock poisoned: {}", e)))?;
        entries.insert(
            decision.request_id.clone(),
            Entry::Decided(decision.clone()),
        );
        Ok(())
    }

    /// Recorded decision for a request id.
    pub fn decision(&self, request_id: &str) -> Option<AuthorizationDecision> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(request_id) {
            Some(Entry::Decided(decision)) => Some(decision.clone()),
            _ => None,
        }
    }

    /// Drop decided entries whose decision is older than `before` (Unix
    /// seconds). Returns how many were removed.
    ///
    /// A pruned id is unknown again: a redelivery after this point is
    /// decided afresh.
    pub fn cleanup_before(&self, before: i64) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| InteractiveError::Internal(format!("Lock poisoned: {}", e)))?;

        let tracked = entries.len();
        entries.retain(|_, entry| match entry {
            Entry::InFlight => true,
            Entry::Decided(decision) => decision.decided_at >= before,
        });
        Ok(tracked - entries.len())
    }

    /// Whether a request id is tracked, in flight or decided.
    pub fn contains(&self, request_id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(request_id)
    }

    /// Number of tracked request ids.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no request has been admitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
