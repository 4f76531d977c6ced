//! Funding rail.
//!
//! After an authorization is approved, the account behind the chosen
//! instrument is charged through a [`FundingExecutor`]. Callers treat each
//! charge as fire-and-forget: executors never retry internally.

mod config;
mod http;

pub use config::{FundingConfig, FundingTargets};
pub use http::HttpFundingExecutor;

use crate::model::FundingTargetId;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A charge to issue against a funding target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Amount in minor currency units (cents).
    pub amount_minor_units: u64,
    /// Lowercase ISO currency code.
    pub currency: String,
    /// Account to charge.
    pub funding_target: FundingTargetId,
    /// Idempotency key forwarded to the rail, normally the authorization
    /// request id.
    pub idempotency_key: String,
}

impl ChargeRequest {
    /// Create a USD charge.
    pub fn new(
        amount_minor_units: u64,
        funding_target: FundingTargetId,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            amount_minor_units,
            currency: "usd".to_string(),
            funding_target,
            idempotency_key: idempotency_key.into(),
        }
    }

    /// Set the currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

/// Rail confirmation of a charge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    /// Rail-assigned charge id.
    pub charge_id: String,
    /// Rail status string (e.g. "succeeded").
    pub status: String,
    /// Amount charged in minor units.
    pub amount_minor_units: u64,
    /// Unix timestamp of the confirmation.
    pub charged_at: i64,
}

/// Issues funding charges.
#[async_trait]
pub trait FundingExecutor: Send + Sync {
    /// Charge `request.amount_minor_units` against `request.funding_target`.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt>;

    /// Executor name for logs.
    fn name(&self) -> &str {
        "funding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_request_defaults_to_usd() {
        let request = ChargeRequest::new(1250, FundingTargetId::new("pm_1"), "auth_1");
        assert_eq!(request.currency, "usd");
        assert_eq!(request.with_currency("eur").currency, "eur");
    }
}
