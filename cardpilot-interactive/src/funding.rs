//! Funding status tracking.
//!
//! Each approved request gets one funding record that moves one way:
//! `Pending -> Succeeded` or `Pending -> Failed`. There is no reversal or
//! retry transition.

use cardpilot_lib::FundingTargetId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Funding states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingStatus {
    /// Charge dispatched, no answer yet.
    Pending,
    /// Charge confirmed.
    Succeeded,
    /// Charge rejected after approval; needs out-of-band reconciliation.
    Failed,
}

impl FundingStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Funding state of one approved request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRecord {
    /// Request id.
    pub request_id: String,
    /// Account charged.
    pub funding_target: FundingTargetId,
    /// Amount in minor units.
    pub amount_minor_units: u64,
    /// Current status.
    pub status: FundingStatus,
    /// Rail charge id, once confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_id: Option<String>,
    /// Error, if failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix timestamp of the last transition.
    pub updated_at: i64,
}

impl FundingRecord {
    /// A new pending record.
    pub fn pending(
        request_id: impl Into<String>,
        funding_target: FundingTargetId,
        amount_minor_units: u64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            funding_target,
            amount_minor_units,
            status: FundingStatus::Pending,
            charge_id: None,
            error: None,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Mark as succeeded. Terminal records are left unchanged.
    pub fn mark_succeeded(&mut self, charge_id: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = FundingStatus::Succeeded;
        self.charge_id = Some(charge_id.into());
        self.updated_at = chrono::Utc::now().timestamp();
        true
    }

    /// Mark as failed. Terminal records are left unchanged.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = FundingStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = chrono::Utc::now().timestamp();
        true
    }
}

/// Thread-safe funding record store.
#[derive(Debug, Default)]
pub struct FundingTracker {
    records: RwLock<HashMap<String, FundingRecord>>,
}

impl FundingTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new pending record.
    pub fn track(&self, record: FundingRecord) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.request_id.clone(), record);
    }

    /// Apply a transition to a tracked record. Returns the updated record.
    pub fn update<F>(&self, request_id: &str, transition: F) -> Option<FundingRecord>
    where
        F: FnOnce(&mut FundingRecord) -> bool,
    {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records.get_mut(request_id)?;
        transition(record);
        Some(record.clone())
    }

    /// Record for a request.
    pub fn get(&self, request_id: &str) -> Option<FundingRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(request_id)
            .cloned()
    }

    /// Drop terminal records last updated before `before` (Unix seconds).
    /// Pending records are kept regardless of age. Returns how many were
    /// removed.
    pub fn cleanup_before(&self, before: i64) -> usize {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let tracked = records.len();
        records.retain(|_, r| !r.status.is_terminal() || r.updated_at >= before);
        tracked - records.len()
    }

    /// Number of tracked records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records in a given status.
    pub fn with_status(&self, status: FundingStatus) -> Vec<FundingRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }
}
