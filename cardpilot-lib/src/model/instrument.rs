//! Payment instruments and the wallet that holds them.

use super::NetworkType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of an instrument in the user's card pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(pub String);

impl InstrumentId {
    /// Create a new InstrumentId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for InstrumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the account actually charged after an approval
/// (for a card rail this is a saved payment method id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FundingTargetId(pub String);

impl FundingTargetId {
    /// Create a new FundingTargetId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FundingTargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for FundingTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A payment card or account the user enrolled in a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Pool identifier.
    pub id: InstrumentId,
    /// Name shown to the user (e.g. "Chase Sapphire Reserve").
    pub display_name: String,
    /// Network key.
    pub network: NetworkType,
    /// Funding target for this specific instrument, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_target: Option<FundingTargetId>,
}

impl Instrument {
    /// Create an instrument without an instrument-level funding target.
    pub fn new(
        id: impl Into<InstrumentId>,
        display_name: impl Into<String>,
        network: NetworkType,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            network,
            funding_target: None,
        }
    }

    /// Attach an instrument-level funding target.
    pub fn with_funding_target(mut self, target: impl Into<String>) -> Self {
        self.funding_target = Some(FundingTargetId::new(target));
        self
    }
}

/// The instruments active for one optimization session.
///
/// Only the first instrument enrolled for a network is visible to the
/// selection engine; later instruments of the same network are kept for
/// display but never chosen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    instruments: Vec<Instrument>,
    #[serde(default)]
    fallback: Option<Instrument>,
    #[serde(default)]
    network_targets: BTreeMap<NetworkType, FundingTargetId>,
}

impl Wallet {
    /// Create a wallet from enrolled instruments, in enrollment order.
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self {
            instruments,
            fallback: None,
            network_targets: BTreeMap::new(),
        }
    }

    /// Designate the fallback instrument.
    pub fn with_fallback(mut self, fallback: Instrument) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Map a network to the funding target used when the winning
    /// instrument has none of its own.
    pub fn with_funding_target(mut self, network: NetworkType, target: FundingTargetId) -> Self {
        self.network_targets.insert(network, target);
        self
    }

    /// Replace the network funding map wholesale.
    pub fn with_funding_targets(mut self, targets: BTreeMap<NetworkType, FundingTargetId>) -> Self {
        self.network_targets = targets;
        self
    }

    /// All enrolled instruments in enrollment order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// The designated fallback instrument.
    pub fn fallback(&self) -> Option<&Instrument> {
        self.fallback.as_ref()
    }

    /// Whether no instruments are enrolled.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// The instrument visible to the engine for a network (first enrolled).
    pub fn instrument_for(&self, network: NetworkType) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.network == network)
    }

    /// Network → visible instrument, duplicates collapsed to the first.
    pub fn index(&self) -> BTreeMap<NetworkType, &Instrument> {
        let mut index = BTreeMap::new();
        for instrument in &self.instruments {
            index.entry(instrument.network).or_insert(instrument);
        }
        index
    }

    /// Networks with at least one enrolled instrument.
    pub fn networks(&self) -> BTreeSet<NetworkType> {
        self.instruments.iter().map(|i| i.network).collect()
    }

    /// Whether the instrument (by id) is enrolled or is the fallback.
    pub fn holds(&self, instrument: &Instrument) -> bool {
        self.instruments.iter().any(|i| i.id == instrument.id)
            || self.fallback.as_ref().is_some_and(|f| f.id == instrument.id)
    }

    /// The wallet instrument to present when `network` wins.
    ///
    /// When `prefer_fallback` is set and the fallback belongs to that network
    /// and is itself enrolled, the fallback is returned; otherwise the first
    /// enrolled instrument of the network.
    pub fn resolve_instrument(
        &self,
        network: NetworkType,
        prefer_fallback: bool,
    ) -> Option<&Instrument> {
        if prefer_fallback {
            if let Some(fallback) = self.fallback.as_ref().filter(|f| f.network == network) {
                if let Some(enrolled) = self.instruments.iter().find(|i| i.id == fallback.id) {
                    return Some(enrolled);
                }
            }
        }
        self.instrument_for(network)
    }

    /// Funding target for a chosen instrument: its own target, else the
    /// wallet-level target for its network.
    pub fn funding_target_for<'a>(
        &'a self,
        instrument: &'a Instrument,
    ) -> Option<&'a FundingTargetId> {
        instrument
            .funding_target
            .as_ref()
            .or_else(|| self.network_targets.get(&instrument.network))
    }
}
