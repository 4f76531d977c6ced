//! Selection Preferences
//!
//! The user's optimization mode and the valuation constants that turn
//! nominal reward rates into comparable values.

use crate::{CardpilotError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the user is optimizing for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceMode {
    /// Prefer cash back; non-cash rewards must be much larger to win.
    Cash,
    /// Maximize rewards; points and miles are valued above face (default).
    #[default]
    Rewards,
}

impl PreferenceMode {
    /// Lowercase key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Rewards => "rewards",
        }
    }
}

impl FromStr for PreferenceMode {
    type Err = CardpilotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "rewards" => Ok(Self::Rewards),
            other => Err(CardpilotError::invalid_data(
                "optimizationPreference",
                format!("expected 'cash' or 'rewards', got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for PreferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valuation constants.
///
/// These encode a business calibration (how much a point is worth relative
/// to a cent of cash back), so they are configuration rather than code.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuationParams {
    /// Multiplier applied to cash-kind rewards in either mode.
    #[serde(default = "default_cash_multiplier")]
    pub cash_multiplier: f64,
    /// Multiplier applied to non-cash rewards in cash mode
    /// (worst-case redemption at half face value).
    #[serde(default = "default_cash_mode_non_cash_multiplier")]
    pub cash_mode_non_cash_multiplier: f64,
    /// Multiplier applied to non-cash rewards in rewards mode
    /// (favorable points/miles redemption).
    #[serde(default = "default_rewards_mode_non_cash_multiplier")]
    pub rewards_mode_non_cash_multiplier: f64,
    /// Two effective values closer than this are a tie.
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f64,
}

fn default_cash_multiplier() -> f64 {
    1.0
}

fn default_cash_mode_non_cash_multiplier() -> f64 {
    0.5
}

fn default_rewards_mode_non_cash_multiplier() -> f64 {
    1.3
}

fn default_tie_epsilon() -> f64 {
    0.01
}

impl Default for ValuationParams {
    fn default() -> Self {
        Self {
            cash_multiplier: default_cash_multiplier(),
            cash_mode_non_cash_multiplier: default_cash_mode_non_cash_multiplier(),
            rewards_mode_non_cash_multiplier: default_rewards_mode_non_cash_multiplier(),
            tie_epsilon: default_tie_epsilon(),
        }
    }
}

impl ValuationParams {
    /// Set the cash-mode devaluation of non-cash rewards.
    pub fn with_cash_mode_non_cash_multiplier(mut self, multiplier: f64) -> Self {
        self.cash_mode_non_cash_multiplier = multiplier;
        self
    }

    /// Set the rewards-mode premium on non-cash rewards.
    pub fn with_rewards_mode_non_cash_multiplier(mut self, multiplier: f64) -> Self {
        self.rewards_mode_non_cash_multiplier = multiplier;
        self
    }

    /// Set the tie epsilon.
    pub fn with_tie_epsilon(mut self, epsilon: f64) -> Self {
        self.tie_epsilon = epsilon;
        self
    }

    /// Reject non-finite or non-positive constants.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cash_multiplier", self.cash_multiplier),
            (
                "cash_mode_non_cash_multiplier",
                self.cash_mode_non_cash_multiplier,
            ),
            (
                "rewards_mode_non_cash_multiplier",
                self.rewards_mode_non_cash_multiplier,
            ),
            ("tie_epsilon", self.tie_epsilon),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(CardpilotError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Multiplier for a reward kind under a mode.
    pub fn multiplier(&self, is_cash: bool, mode: PreferenceMode) -> f64 {
        match (is_cash, mode) {
            (true, _) => self.cash_multiplier,
            (false, PreferenceMode::Cash) => self.cash_mode_non_cash_multiplier,
            (false, PreferenceMode::Rewards) => self.rewards_mode_non_cash_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_rewards() {
        assert_eq!(PreferenceMode::default(), PreferenceMode::Rewards);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("cash".parse::<PreferenceMode>().unwrap(), PreferenceMode::Cash);
        assert_eq!(
            " Rewards ".parse::<PreferenceMode>().unwrap(),
            PreferenceMode::Rewards
        );
        assert!("points".parse::<PreferenceMode>().is_err());
    }

    #[test]
    fn test_default_params() {
        let params = ValuationParams::default();
        assert_eq!(params.cash_multiplier, 1.0);
        assert_eq!(params.cash_mode_non_cash_multiplier, 0.5);
        assert_eq!(params.rewards_mode_non_cash_multiplier, 1.3);
        assert_eq!(params.tie_epsilon, 0.01);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_deserialize_with_defaults() {
        let params: ValuationParams = serde_json::from_str(r#"{"tie_epsilon": 0.05}"#).unwrap();
        assert_eq!(params.tie_epsilon, 0.05);
        assert_eq!(params.cash_mode_non_cash_multiplier, 0.5);
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        assert!(ValuationParams::default()
            .with_tie_epsilon(0.0)
            .validate()
            .is_err());
        assert!(ValuationParams::default()
            .with_cash_mode_non_cash_multiplier(f64::INFINITY)
            .validate()
            .is_err());
    }
}
