//! Optimization sessions.
//!
//! A session bundles everything a selection reads: the wallet, the active
//! reward table and the preference mode. Sessions are immutable; starting a
//! new one replaces the previous context wholesale, so an in-flight request
//! that captured the old context keeps a consistent view.

use crate::model::{FundingTargetId, Instrument, NetworkType, RewardTable, Wallet};
use crate::rankings::RankingSource;
use crate::selection::{NoMatch, PreferenceMode, SelectionEngine, SelectionResult, ValuationParams};
use crate::{CardpilotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Card-pool id: the pool uses numbers, callers sometimes send strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoolCardId {
    /// Numeric id.
    Number(u64),
    /// String id.
    Text(String),
}

impl PoolCardId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// A card as submitted by the "set wallet" caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCard {
    /// Pool id.
    pub id: Option<PoolCardId>,
    /// Display name.
    pub card_name: Option<String>,
    /// Network label ("Visa", "American Express").
    #[serde(default)]
    pub card_type: Option<String>,
    /// Network key or pool key.
    #[serde(default)]
    pub card_key: Option<String>,
    /// Instrument-level funding target, if the caller knows it.
    #[serde(default)]
    pub funding_target: Option<String>,
}

impl PoolCard {
    /// Validate into an [`Instrument`].
    pub fn into_instrument(self) -> Result<Instrument> {
        let id = self
            .id
            .map(PoolCardId::into_string)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| CardpilotError::invalid_data("id", "card id is required"))?;

        let network = self
            .card_type
            .as_deref()
            .and_then(NetworkType::canonicalize)
            .or_else(|| self.card_key.as_deref().and_then(NetworkType::canonicalize))
            .ok_or_else(|| {
                CardpilotError::UnknownNetwork(
                    self.card_type
                        .clone()
                        .or_else(|| self.card_key.clone())
                        .unwrap_or_default(),
                )
            })?;

        let display_name = self.card_name.unwrap_or_else(|| id.clone());
        let instrument = Instrument::new(id, display_name, network);
        Ok(match self.funding_target {
            Some(target) => instrument.with_funding_target(target),
            None => instrument,
        })
    }
}

/// Input of the "set wallet" operation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Active instruments; required and non-empty.
    pub selected_cards: Option<Vec<PoolCard>>,
    /// Designated fallback instrument.
    #[serde(default)]
    pub backup_card: Option<PoolCard>,
    /// "cash" or "rewards"; defaults to rewards.
    #[serde(default)]
    pub optimization_preference: Option<String>,
}

impl SessionRequest {
    /// Validate the request into a wallet and a mode.
    ///
    /// `funding_targets` is the operator's network → funding target map.
    pub fn into_wallet(
        self,
        funding_targets: &BTreeMap<NetworkType, FundingTargetId>,
    ) -> Result<(Wallet, PreferenceMode)> {
        let cards = self
            .selected_cards
            .ok_or_else(|| CardpilotError::invalid_data("selectedCards", "missing"))?;
        if cards.is_empty() {
            return Err(CardpilotError::invalid_data(
                "selectedCards",
                "at least one card is required",
            ));
        }

        let instruments = cards
            .into_iter()
            .map(PoolCard::into_instrument)
            .collect::<Result<Vec<_>>>()?;

        let mode = match self.optimization_preference.as_deref() {
            None | Some("") => PreferenceMode::default(),
            Some(raw) => raw.parse()?,
        };

        let mut wallet = Wallet::new(instruments).with_funding_targets(funding_targets.clone());
        if let Some(backup) = self.backup_card {
            wallet = wallet.with_fallback(backup.into_instrument()?);
        }

        Ok((wallet, mode))
    }
}

/// Immutable per-session selection context.
#[derive(Clone, Debug)]
pub struct SessionContext {
    wallet: Wallet,
    mode: PreferenceMode,
    table: Arc<RewardTable>,
    source: RankingSource,
    engine: SelectionEngine,
    started_at: DateTime<Utc>,
}

impl SessionContext {
    /// Create a context with default valuation constants.
    pub fn new(
        wallet: Wallet,
        mode: PreferenceMode,
        table: Arc<RewardTable>,
        source: RankingSource,
    ) -> Self {
        Self {
            wallet,
            mode,
            table,
            source,
            engine: SelectionEngine::default(),
            started_at: Utc::now(),
        }
    }

    /// Use explicit valuation constants.
    pub fn with_valuation(mut self, params: ValuationParams) -> Self {
        self.engine = SelectionEngine::new(params);
        self
    }

    /// An empty session: every request declines until a wallet is set.
    pub fn empty() -> Self {
        Self::new(
            Wallet::default(),
            PreferenceMode::default(),
            Arc::new(RewardTable::new()),
            RankingSource::Default,
        )
    }

    /// The session wallet.
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// The session mode.
    pub fn mode(&self) -> PreferenceMode {
        self.mode
    }

    /// The active reward table.
    pub fn table(&self) -> &Arc<RewardTable> {
        &self.table
    }

    /// Where the active table came from.
    pub fn source(&self) -> RankingSource {
        self.source
    }

    /// When the session started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Run the selection engine against this session.
    pub fn select(&self, mcc: &str) -> std::result::Result<SelectionResult, NoMatch> {
        self.engine.select(mcc, &self.table, &self.wallet, self.mode)
    }
}
