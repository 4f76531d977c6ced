//! Top-level configuration.
//!
//! Loaded from a JSON file or from `CARDPILOT_*` environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CARDPILOT_TIME_BUDGET_MS` | `default_time_budget_ms` |
//! | `CARDPILOT_CASH_MODE_NON_CASH_MULTIPLIER` | `valuation.cash_mode_non_cash_multiplier` |
//! | `CARDPILOT_REWARDS_MODE_NON_CASH_MULTIPLIER` | `valuation.rewards_mode_non_cash_multiplier` |
//! | `CARDPILOT_TIE_EPSILON` | `valuation.tie_epsilon` |
//! | `CARDPILOT_RANKINGS_FILE` | `rankings_file` |
//! | `CARDPILOT_RANKINGS_CACHE_DIR` | `rankings_cache_dir` |
//! | `CARDPILOT_RETENTION_SECS` | `retention_secs` |
//! | `CARDPILOT_FUNDING_*` | `funding` (see [`FundingConfig::from_lookup`]) |
//! | `CARDPILOT_FUNDING_TARGET_<NETWORK>` | `funding_targets` |

use crate::funding::{FundingConfig, FundingTargets};
use crate::selection::ValuationParams;
use crate::{CardpilotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardpilotConfig {
    /// Valuation constants.
    #[serde(default)]
    pub valuation: ValuationParams,

    /// Decision deadline used when a request carries none.
    #[serde(default = "default_time_budget_ms")]
    pub default_time_budget_ms: u64,

    /// Funding rail; required to build an authorization manager.
    #[serde(default)]
    pub funding: Option<FundingConfig>,

    /// Network → funding target.
    #[serde(default)]
    pub funding_targets: FundingTargets,

    /// Built-in ranking document.
    #[serde(default)]
    pub rankings_file: Option<PathBuf>,

    /// Directory mirroring the per-wallet ranking cache.
    #[serde(default)]
    pub rankings_cache_dir: Option<PathBuf>,

    /// How long decided requests and settled funding records are kept.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

fn default_time_budget_ms() -> u64 {
    2000
}

fn default_retention_secs() -> u64 {
    24 * 60 * 60
}

impl Default for CardpilotConfig {
    fn default() -> Self {
        Self {
            valuation: ValuationParams::default(),
            default_time_budget_ms: default_time_budget_ms(),
            funding: None,
            funding_targets: FundingTargets::default(),
            rankings_file: None,
            rankings_cache_dir: None,
            retention_secs: default_retention_secs(),
        }
    }
}

impl CardpilotConfig {
    /// Default decision deadline.
    pub fn default_time_budget(&self) -> Duration {
        Duration::from_millis(self.default_time_budget_ms)
    }

    /// Retention window for protocol records.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Set the funding rail.
    pub fn with_funding(mut self, funding: FundingConfig) -> Self {
        self.funding = Some(funding);
        self
    }

    /// Set the funding targets.
    pub fn with_funding_targets(mut self, targets: FundingTargets) -> Self {
        self.funding_targets = targets;
        self
    }

    /// Set the default time budget.
    pub fn with_time_budget_ms(mut self, ms: u64) -> Self {
        self.default_time_budget_ms = ms;
        self
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.valuation.validate()?;
        if self.default_time_budget_ms == 0 {
            return Err(CardpilotError::Config(
                "default_time_budget_ms must be > 0".into(),
            ));
        }
        if self.retention_secs == 0 {
            return Err(CardpilotError::Config("retention_secs must be > 0".into()));
        }
        if let Some(funding) = &self.funding {
            funding.validate()?;
        }
        Ok(())
    }

    /// Load and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                CardpilotError::not_found("config file", path.display().to_string())
            }
            _ => CardpilotError::from(err),
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from variables provided by `lookup`. Unset variables keep their
    /// defaults; unparsable numbers are a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, "CARDPILOT_TIME_BUDGET_MS")? {
            config.default_time_budget_ms = ms;
        }
        if let Some(m) = parse_var::<f64, _>(&lookup, "CARDPILOT_CASH_MODE_NON_CASH_MULTIPLIER")? {
            config.valuation.cash_mode_non_cash_multiplier = m;
        }
        if let Some(m) = parse_var::<f64, _>(&lookup, "CARDPILOT_REWARDS_MODE_NON_CASH_MULTIPLIER")? {
            config.valuation.rewards_mode_non_cash_multiplier = m;
        }
        if let Some(eps) = parse_var::<f64, _>(&lookup, "CARDPILOT_TIE_EPSILON")? {
            config.valuation.tie_epsilon = eps;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CARDPILOT_RETENTION_SECS")? {
            config.retention_secs = secs;
        }

        config.rankings_file = lookup("CARDPILOT_RANKINGS_FILE").map(PathBuf::from);
        config.rankings_cache_dir = lookup("CARDPILOT_RANKINGS_CACHE_DIR").map(PathBuf::from);
        config.funding = FundingConfig::from_lookup(&lookup)?;
        config.funding_targets = FundingTargets::from_lookup(&lookup);

        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

pub(crate) fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CardpilotError::Config(format!("{}: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkType;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CardpilotConfig::default();
        assert_eq!(config.default_time_budget(), Duration::from_millis(2000));
        assert!(config.funding.is_none());
        assert_eq!(config.retention_secs, 86_400);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = CardpilotConfig::from_lookup(lookup(&[
            ("CARDPILOT_TIME_BUDGET_MS", "750"),
            ("CARDPILOT_TIE_EPSILON", "0.05"),
            ("CARDPILOT_FUNDING_SECRET_KEY", "sk_test"),
            ("CARDPILOT_FUNDING_CUSTOMER_ID", "cus_1"),
            ("CARDPILOT_FUNDING_TARGET_DISCOVER", "pm_disc"),
            ("CARDPILOT_RETENTION_SECS", "3600"),
        ]))
        .unwrap();

        assert_eq!(config.default_time_budget_ms, 750);
        assert_eq!(config.valuation.tie_epsilon, 0.05);
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.funding.unwrap().customer_id, "cus_1");
        assert_eq!(
            config
                .funding_targets
                .get(NetworkType::Discover)
                .unwrap()
                .as_str(),
            "pm_disc"
        );
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = CardpilotConfig::from_lookup(lookup(&[("CARDPILOT_TIME_BUDGET_MS", "soon")]))
            .unwrap_err();
        assert_eq!(err.code(), crate::CardpilotErrorCode::Config);

        assert!(
            CardpilotConfig::from_lookup(lookup(&[("CARDPILOT_TIE_EPSILON", "-1")])).is_err()
        );
        assert!(
            CardpilotConfig::from_lookup(lookup(&[("CARDPILOT_RETENTION_SECS", "0")])).is_err()
        );

        let err = CardpilotConfig::from_lookup(lookup(&[
            ("CARDPILOT_FUNDING_SECRET_KEY", "sk_test"),
            ("CARDPILOT_FUNDING_CUSTOMER_ID", "cus_1"),
            ("CARDPILOT_FUNDING_TIMEOUT", "never"),
        ]))
        .unwrap_err();
        assert_eq!(err.code(), crate::CardpilotErrorCode::Config);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cardpilot.json");
        std::fs::write(
            &path,
            r#"{
                "default_time_budget_ms": 1500,
                "valuation": {"cash_mode_non_cash_multiplier": 0.6},
                "funding": {"secret_key": "sk_test", "customer_id": "cus_1"},
                "funding_targets": {"amex": "pm_amex"}
            }"#,
        )
        .unwrap();

        let config = CardpilotConfig::from_json_file(&path).unwrap();
        assert_eq!(config.default_time_budget_ms, 1500);
        assert_eq!(config.valuation.cash_mode_non_cash_multiplier, 0.6);
        assert_eq!(config.valuation.tie_epsilon, 0.01);
        assert!(config.funding_targets.get(NetworkType::Amex).is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = CardpilotConfig::from_json_file("/nonexistent/cardpilot.json").unwrap_err();
        assert_eq!(err.code(), crate::CardpilotErrorCode::NotFound);
    }
}
