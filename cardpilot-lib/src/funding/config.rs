//! Configuration types for the funding rail.

use crate::config::parse_var;
use crate::model::{FundingTargetId, NetworkType};
use crate::{CardpilotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the HTTP funding executor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundingConfig {
    /// API base URL (e.g. "https://api.stripe.com").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Secret API key, sent as a bearer token.
    pub secret_key: String,

    /// Customer that owns the saved funding targets.
    pub customer_id: String,

    /// Charge currency.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl FundingConfig {
    /// Create a new funding configuration.
    pub fn new(secret_key: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            api_url: default_api_url(),
            secret_key: secret_key.into(),
            customer_id: customer_id.into(),
            currency: default_currency(),
            timeout_secs: default_timeout(),
        }
    }

    /// Set the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the charge currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Reject empty credentials.
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.trim().is_empty() {
            return Err(CardpilotError::Config("funding secret_key is empty".into()));
        }
        if self.customer_id.trim().is_empty() {
            return Err(CardpilotError::Config("funding customer_id is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CardpilotError::Config("funding timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Load from `CARDPILOT_FUNDING_*` variables via `lookup`.
    ///
    /// Returns `None` unless both the secret key and the customer id are set.
    /// An unparsable timeout is a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (secret, customer) = match (
            lookup("CARDPILOT_FUNDING_SECRET_KEY"),
            lookup("CARDPILOT_FUNDING_CUSTOMER_ID"),
        ) {
            (Some(secret), Some(customer)) => (secret, customer),
            _ => return Ok(None),
        };

        let mut config = Self::new(secret, customer);

        if let Some(url) = lookup("CARDPILOT_FUNDING_API_URL") {
            config = config.with_api_url(url);
        }

        if let Some(currency) = lookup("CARDPILOT_FUNDING_CURRENCY") {
            config = config.with_currency(currency.to_lowercase());
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "CARDPILOT_FUNDING_TIMEOUT")? {
            config = config.with_timeout(secs);
        }

        Ok(Some(config))
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Network → funding target map configured by the operator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundingTargets(pub BTreeMap<NetworkType, FundingTargetId>);

impl FundingTargets {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping.
    pub fn with_target(mut self, network: NetworkType, target: impl Into<String>) -> Self {
        self.0.insert(network, FundingTargetId::new(target));
        self
    }

    /// Target for a network.
    pub fn get(&self, network: NetworkType) -> Option<&FundingTargetId> {
        self.0.get(&network)
    }

    /// Networks without a target.
    pub fn missing(&self) -> Vec<NetworkType> {
        NetworkType::ALL
            .into_iter()
            .filter(|n| !self.0.contains_key(n))
            .collect()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &BTreeMap<NetworkType, FundingTargetId> {
        &self.0
    }

    /// Read `CARDPILOT_FUNDING_TARGET_<NETWORK>` for every network via
    /// `lookup`. Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut targets = Self::new();
        for network in NetworkType::ALL {
            let key = format!("CARDPILOT_FUNDING_TARGET_{}", network.env_suffix());
            if let Some(value) = lookup(&key).filter(|v| !v.trim().is_empty()) {
                targets = targets.with_target(network, value.trim());
            }
        }
        targets
    }

    /// Read per-network targets from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
