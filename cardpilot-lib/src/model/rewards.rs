//! Reward tables: merchant category code → ranked reward entries.
//!
//! Tables are computed elsewhere and arrive as JSON in the ranking format:
//!
//! ```json
//! {
//!   "5812": [
//!     { "cardName": "Amex Gold", "cardKey": "amex", "rewardAmount": 4.0, "rewardType": "Points" },
//!     { "cardName": "Savor", "cardType": "Mastercard", "rewardAmount": 3.0, "rewardType": "Cash Back" }
//!   ]
//! }
//! ```
//!
//! `cardKey` is tried first when resolving the network, then `cardType`.

use super::NetworkType;
use crate::{CardpilotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reward kind label ("Cash Back", "Points", "Miles", ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardKind(pub String);

impl RewardKind {
    /// Create a reward kind from its label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Plain cash kind.
    pub fn cash() -> Self {
        Self::new("Cash")
    }

    /// Whether the label denotes cash (any label containing "cash").
    pub fn is_cash(&self) -> bool {
        self.0.to_lowercase().contains("cash")
    }

    /// Get the label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RewardKind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ranked reward for a network within a merchant category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardEntry {
    /// Network the reward applies to.
    pub network: NetworkType,
    /// Reward multiplier; always finite and > 0.
    pub reward_amount: f64,
    /// Reward kind.
    pub reward_kind: RewardKind,
    /// Card name as labelled by the ranking source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_name: Option<String>,
}

impl RewardEntry {
    /// Create an entry, rejecting non-positive or non-finite amounts.
    pub fn new(
        network: NetworkType,
        reward_amount: f64,
        reward_kind: impl Into<RewardKind>,
    ) -> Result<Self> {
        if !reward_amount.is_finite() || reward_amount <= 0.0 {
            return Err(CardpilotError::invalid_data(
                "rewardAmount",
                format!("must be a positive number, got {}", reward_amount),
            ));
        }
        Ok(Self {
            network,
            reward_amount,
            reward_kind: reward_kind.into(),
            card_name: None,
        })
    }

    /// Attach the ranking source's card label.
    pub fn with_card_name(mut self, name: impl Into<String>) -> Self {
        self.card_name = Some(name.into());
        self
    }
}

/// Wire shape of a ranked card in ranking files.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCard {
    /// Card label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_name: Option<String>,
    /// Network key or a source-specific key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_key: Option<String>,
    /// Network label ("Visa", "American Express").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    /// Reward multiplier.
    pub reward_amount: f64,
    /// Reward kind label.
    #[serde(default = "default_reward_type")]
    pub reward_type: String,
}

fn default_reward_type() -> String {
    "Points".to_string()
}

impl RankedCard {
    /// Resolve the network: `cardKey` first, then `cardType`.
    pub fn network(&self) -> Option<NetworkType> {
        self.card_key
            .as_deref()
            .and_then(NetworkType::canonicalize)
            .or_else(|| self.card_type.as_deref().and_then(NetworkType::canonicalize))
    }

    /// Convert to a validated [`RewardEntry`].
    pub fn into_entry(self) -> Result<RewardEntry> {
        let network = self.network().ok_or_else(|| {
            CardpilotError::UnknownNetwork(
                self.card_key
                    .clone()
                    .or_else(|| self.card_type.clone())
                    .unwrap_or_default(),
            )
        })?;
        let entry = RewardEntry::new(network, self.reward_amount, RewardKind(self.reward_type))?;
        Ok(match self.card_name {
            Some(name) => entry.with_card_name(name),
            None => entry,
        })
    }
}

impl From<&RewardEntry> for RankedCard {
    fn from(entry: &RewardEntry) -> Self {
        Self {
            card_name: entry.card_name.clone(),
            card_key: Some(entry.network.as_str().to_string()),
            card_type: None,
            reward_amount: entry.reward_amount,
            reward_type: entry.reward_kind.0.clone(),
        }
    }
}

/// Merchant category code → ranked entries, in ranking order.
///
/// Read-only during a selection run; sessions swap whole tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RewardTable {
    categories: BTreeMap<String, Vec<RewardEntry>>,
}

impl RewardTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the ranking for a category.
    pub fn with_category(mut self, mcc: impl Into<String>, entries: Vec<RewardEntry>) -> Self {
        self.insert(mcc, entries);
        self
    }

    /// Add (or replace) the ranking for a category.
    pub fn insert(&mut self, mcc: impl Into<String>, entries: Vec<RewardEntry>) {
        self.categories.insert(mcc.into(), entries);
    }

    /// Ranked entries for a category, if any.
    pub fn get(&self, mcc: &str) -> Option<&[RewardEntry]> {
        self.categories.get(mcc.trim()).map(Vec::as_slice)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the table has no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category codes in the table.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Parse a ranking document.
    ///
    /// Malformed JSON is an error. Individual entries whose network cannot be
    /// resolved or whose amount is not positive are dropped; the number of
    /// dropped entries is returned alongside the table.
    pub fn from_rankings_json(json: &str) -> Result<(Self, usize)> {
        let raw: BTreeMap<String, Vec<RankedCard>> = serde_json::from_str(json)?;
        let mut table = Self::new();
        let mut dropped = 0;

        for (mcc, cards) in raw {
            let mut entries = Vec::with_capacity(cards.len());
            for card in cards {
                match card.into_entry() {
                    Ok(entry) => entries.push(entry),
                    Err(_err) => {
                        dropped += 1;
                        #[cfg(feature = "tracing")]
                        tracing::warn!(mcc = %mcc, error = %_err, "dropping ranking entry");
                    }
                }
            }
            table.insert(mcc, entries);
        }

        Ok((table, dropped))
    }

    /// Serialize back to the ranking format.
    pub fn to_rankings_json(&self) -> Result<String> {
        let raw: BTreeMap<&str, Vec<RankedCard>> = self
            .categories
            .iter()
            .map(|(mcc, entries)| (mcc.as_str(), entries.iter().map(RankedCard::from).collect()))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}
