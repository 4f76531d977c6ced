//! Instrument Selector
//!
//! This module implements the ranking that picks one wallet instrument for a
//! merchant category.

use super::preferences::{PreferenceMode, ValuationParams};
use super::value::effective_value_with;
use crate::model::{
    FundingTargetId, Instrument, NetworkType, RewardEntry, RewardKind, RewardTable, Wallet,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Why no instrument was selected. Every variant means "decline".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoMatch {
    /// The table has no ranking (or an empty ranking) for the category.
    #[error("no ranking data for category {mcc}")]
    NoRankingData {
        /// Merchant category code
        mcc: String,
    },
    /// None of the category's ranked networks is in the wallet.
    #[error("no wallet instrument matches the ranked networks for category {mcc}")]
    NoEligibleInstrument {
        /// Merchant category code
        mcc: String,
    },
    /// The winning network has nothing configured to charge.
    #[error("no funding target configured for network {network}")]
    UnconfiguredFundingTarget {
        /// Winning network
        network: NetworkType,
    },
}

impl NoMatch {
    /// Whether this outcome points at an operator configuration defect
    /// rather than an ordinary decline.
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, Self::UnconfiguredFundingTarget { .. })
    }
}

/// Which rule decided the winner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Cash mode, cash entries eligible: top effective value.
    BestCashValue,
    /// Cash mode, no cash entry eligible: the fallback's network.
    FallbackWithoutCash,
    /// Cash mode, no cash entry and no usable fallback: top effective value.
    BestNonCashValue,
    /// Rewards mode: top effective value.
    BestRewardsValue,
    /// Rewards mode, tie at the top: the fallback's network.
    FallbackTieBreak,
}

impl SelectionRule {
    /// Whether the fallback instrument decided the outcome.
    pub fn used_fallback(&self) -> bool {
        matches!(self, Self::FallbackWithoutCash | Self::FallbackTieBreak)
    }
}

/// The chosen instrument for one authorization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Merchant category the selection was made for.
    pub mcc: String,
    /// The wallet instrument (never the ranking table's label).
    pub instrument: Instrument,
    /// Winning network.
    pub network: NetworkType,
    /// Nominal reward multiplier of the winning entry.
    pub reward_amount: f64,
    /// Reward kind of the winning entry.
    pub reward_kind: RewardKind,
    /// Effective value under `mode`.
    pub effective_value: f64,
    /// Account to charge.
    pub funding_target: FundingTargetId,
    /// Mode the selection ran under.
    pub mode: PreferenceMode,
    /// Deciding rule.
    pub rule: SelectionRule,
    /// Human-readable explanation.
    pub reason: String,
}

impl SelectionResult {
    /// Display label, e.g. `"Amex Gold (4x Points)"`.
    pub fn label(&self) -> String {
        format!(
            "{} ({}x {})",
            self.instrument.display_name, self.reward_amount, self.reward_kind
        )
    }
}

/// A ranked, wallet-eligible table entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate<'a> {
    /// Table entry.
    pub entry: &'a RewardEntry,
    /// Effective value under the requested mode.
    pub effective_value: f64,
}

/// Selects the best wallet instrument for a merchant category.
#[derive(Clone, Debug, Default)]
pub struct SelectionEngine {
    params: ValuationParams,
}

impl SelectionEngine {
    /// Create an engine with the given valuation constants.
    pub fn new(params: ValuationParams) -> Self {
        Self { params }
    }

    /// Valuation constants in use.
    pub fn params(&self) -> &ValuationParams {
        &self.params
    }

    /// Wallet-eligible entries for a category, sorted by effective value
    /// (descending). Equal values keep table order.
    pub fn candidates<'a>(
        &self,
        mcc: &str,
        table: &'a RewardTable,
        wallet: &Wallet,
        mode: PreferenceMode,
    ) -> Result<Vec<Candidate<'a>>, NoMatch> {
        let ranking = match table.get(mcc) {
            Some(entries) if !entries.is_empty() => entries,
            _ => {
                return Err(NoMatch::NoRankingData {
                    mcc: mcc.to_string(),
                })
            }
        };

        let index = wallet.index();
        let mut candidates: Vec<Candidate<'a>> = ranking
            .iter()
            .filter(|entry| index.contains_key(&entry.network))
            .map(|entry| Candidate {
                entry,
                effective_value: effective_value_with(
                    entry.reward_amount,
                    &entry.reward_kind,
                    mode,
                    &self.params,
                ),
            })
            .collect();

        if candidates.is_empty() {
            return Err(NoMatch::NoEligibleInstrument {
                mcc: mcc.to_string(),
            });
        }

        // sort_by is stable
        candidates.sort_by(|a, b| {
            b.effective_value
                .partial_cmp(&a.effective_value)
                .unwrap_or(Ordering::Equal)
        });

        Ok(candidates)
    }

    /// Select the instrument to fund a purchase in `mcc`.
    ///
    /// Pure: identical inputs give identical results, and the returned
    /// instrument is always one the wallet holds.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, table, wallet, mode), fields(mode = %mode))
    )]
    pub fn select(
        &self,
        mcc: &str,
        table: &RewardTable,
        wallet: &Wallet,
        mode: PreferenceMode,
    ) -> Result<SelectionResult, NoMatch> {
        let candidates = self.candidates(mcc, table, wallet, mode)?;
        let (winner, rule) = self.pick(&candidates, wallet, mode);

        let network = winner.entry.network;
        let instrument = wallet
            .resolve_instrument(network, rule.used_fallback())
            .ok_or_else(|| NoMatch::NoEligibleInstrument {
                mcc: mcc.to_string(),
            })?;

        let funding_target = match wallet.funding_target_for(instrument) {
            Some(target) => target.clone(),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%network, instrument = %instrument.id, "winning network has no funding target");
                return Err(NoMatch::UnconfiguredFundingTarget { network });
            }
        };

        let reason = format_reason(instrument, rule);

        Ok(SelectionResult {
            mcc: mcc.trim().to_string(),
            instrument: instrument.clone(),
            network,
            reward_amount: winner.entry.reward_amount,
            reward_kind: winner.entry.reward_kind.clone(),
            effective_value: winner.effective_value,
            funding_target,
            mode,
            rule,
            reason,
        })
    }

    /// Apply the mode-specific rule to sorted candidates.
    fn pick<'c, 'a>(
        &self,
        candidates: &'c [Candidate<'a>],
        wallet: &Wallet,
        mode: PreferenceMode,
    ) -> (&'c Candidate<'a>, SelectionRule) {
        let top = &candidates[0];
        let fallback_network = wallet.fallback().map(|f| f.network);

        match mode {
            PreferenceMode::Cash => {
                if candidates.iter().any(|c| c.entry.reward_kind.is_cash()) {
                    return (top, SelectionRule::BestCashValue);
                }
                let fallback_entry = fallback_network
                    .and_then(|network| candidates.iter().find(|c| c.entry.network == network));
                match fallback_entry {
                    Some(candidate) => (candidate, SelectionRule::FallbackWithoutCash),
                    None => (top, SelectionRule::BestNonCashValue),
                }
            }
            PreferenceMode::Rewards => {
                let tied: Vec<&Candidate<'a>> = candidates
                    .iter()
                    .filter(|c| (c.effective_value - top.effective_value).abs() < self.params.tie_epsilon)
                    .collect();

                if tied.len() > 1 {
                    let fallback_entry = fallback_network
                        .and_then(|network| tied.iter().copied().find(|c| c.entry.network == network));
                    if let Some(candidate) = fallback_entry {
                        return (candidate, SelectionRule::FallbackTieBreak);
                    }
                }
                (top, SelectionRule::BestRewardsValue)
            }
        }
    }
}

/// Select with the default valuation constants.
pub fn select(
    mcc: &str,
    table: &RewardTable,
    wallet: &Wallet,
    mode: PreferenceMode,
) -> Result<SelectionResult, NoMatch> {
    SelectionEngine::default().select(mcc, table, wallet, mode)
}

fn format_reason(instrument: &Instrument, rule: SelectionRule) -> String {
    let name = &instrument.display_name;
    match rule {
        SelectionRule::BestCashValue => format!("Selected {} for highest cash value", name),
        SelectionRule::FallbackWithoutCash => {
            format!("Selected fallback {} (no cash back card eligible)", name)
        }
        SelectionRule::BestNonCashValue => {
            format!("Selected {} as best available points card", name)
        }
        SelectionRule::BestRewardsValue => format!("Selected {} for highest rewards value", name),
        SelectionRule::FallbackTieBreak => {
            format!("Selected fallback {} to break a rewards tie", name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(network: NetworkType, amount: f64, kind: &str) -> RewardEntry {
        RewardEntry::new(network, amount, kind).unwrap()
    }

    fn instrument(id: &str, name: &str, network: NetworkType) -> Instrument {
        Instrument::new(id, name, network).with_funding_target(format!("pm_{}", id))
    }

    fn wallet(instruments: Vec<Instrument>) -> Wallet {
        Wallet::new(instruments)
    }

    #[test]
    fn test_unknown_category_is_no_ranking_data() {
        let table = RewardTable::new();
        let wallet = wallet(vec![instrument("v", "Visa", NetworkType::Visa)]);

        let result = select("5812", &table, &wallet, PreferenceMode::Rewards);
        assert_eq!(
            result,
            Err(NoMatch::NoRankingData { mcc: "5812".into() })
        );
    }

    #[test]
    fn test_empty_category_is_no_ranking_data() {
        let table = RewardTable::new().with_category("5812", vec![]);
        let wallet = wallet(vec![instrument("v", "Visa", NetworkType::Visa)]);

        let result = select("5812", &table, &wallet, PreferenceMode::Cash);
        assert!(matches!(result, Err(NoMatch::NoRankingData { .. })));
    }

    #[test]
    fn test_no_overlap_is_no_eligible_instrument() {
        let table = RewardTable::new()
            .with_category("5411", vec![entry(NetworkType::Discover, 5.0, "Cash Back")]);
        let wallet = wallet(vec![instrument("v", "Visa", NetworkType::Visa)]);

        let result = select("5411", &table, &wallet, PreferenceMode::Cash);
        assert_eq!(
            result,
            Err(NoMatch::NoEligibleInstrument { mcc: "5411".into() })
        );
    }

    #[test]
    fn test_cash_mode_cash_beats_points() {
        let table = RewardTable::new().with_category(
            "5812",
            vec![
                entry(NetworkType::Visa, 3.0, "Points"),
                entry(NetworkType::Amex, 2.0, "Cash"),
            ],
        );
        let wallet = wallet(vec![
            instrument("v", "Sapphire", NetworkType::Visa),
            instrument("a", "Blue Cash", NetworkType::Amex),
        ]);

        let result = select("5812", &table, &wallet, PreferenceMode::Cash).unwrap();
        assert_eq!(result.network, NetworkType::Amex);
        assert_eq!(result.rule, SelectionRule::BestCashValue);
        assert_eq!(result.effective_value, 2.0);
        assert_eq!(result.funding_target.as_str(), "pm_a");
    }

    #[test]
    fn test_cash_mode_points_win_when_more_than_double() {
        let table = RewardTable::new().with_category(
            "5812",
            vec![
                entry(NetworkType::Amex, 2.0, "Cash"),
                entry(NetworkType::Visa, 5.0, "Points"),
            ],
        );
        let wallet = wallet(vec![
            instrument("v", "Sapphire", NetworkType::Visa),
            instrument("a", "Blue Cash", NetworkType::Amex),
        ]);

        let result = select("5812", &table, &wallet, PreferenceMode::Cash).unwrap();
        assert_eq!(result.network, NetworkType::Visa);
        assert_eq!(result.rule, SelectionRule::BestCashValue);
    }

    #[test]
    fn test_cash_mode_without_cash_uses_fallback() {
        let table = RewardTable::new().with_category(
            "4511",
            vec![
                entry(NetworkType::Visa, 5.0, "Miles"),
                entry(NetworkType::Mastercard, 2.0, "Points"),
            ],
        );
        let mc = instrument("m", "Venture", NetworkType::Mastercard);
        let wallet = wallet(vec![instrument("v", "Sapphire", NetworkType::Visa), mc.clone()])
            .with_fallback(mc);

        let result = select("4511", &table, &wallet, PreferenceMode::Cash).unwrap();
        assert_eq!(result.network, NetworkType::Mastercard);
        assert_eq!(result.rule, SelectionRule::FallbackWithoutCash);
        assert_eq!(result.reward_amount, 2.0);
    }

    #[test]
    fn test_cash_mode_without_cash_or_fallback_takes_top() {
        let table = RewardTable::new().with_category(
            "4511",
            vec![
                entry(NetworkType::Mastercard, 2.0, "Points"),
                entry(NetworkType::Visa, 5.0, "Miles"),
            ],
        );
        let wallet = wallet(vec![
            instrument("v", "Sapphire", NetworkType::Visa),
            instrument("m", "Venture", NetworkType::Mastercard),
        ])
        .with_fallback(instrument("d", "Discover It", NetworkType::Discover));

        let result = select("4511", &table, &wallet, PreferenceMode::Cash).unwrap();
        assert_eq!(result.network, NetworkType::Visa);
        assert_eq!(result.rule, SelectionRule::BestNonCashValue);
    }

    #[test]
    fn test_rewards_tie_uses_fallback() {
        let table = RewardTable::new().with_category(
            "4511",
            vec![
                entry(NetworkType::Visa, 4.0, "Miles"),
                entry(NetworkType::Mastercard, 4.0, "Miles"),
            ],
        );
        let mc = instrument("m", "Venture", NetworkType::Mastercard);
        let wallet = wallet(vec![instrument("v", "Sapphire", NetworkType::Visa), mc.clone()])
            .with_fallback(mc);

        let result = select("4511", &table, &wallet, PreferenceMode::Rewards).unwrap();
        assert_eq!(result.network, NetworkType::Mastercard);
        assert_eq!(result.rule, SelectionRule::FallbackTieBreak);
        assert!((result.effective_value - 5.2).abs() < 1e-9);
    }

    #[test]
    fn test_rewards_tie_without_fallback_keeps_table_order() {
        let table = RewardTable::new().with_category(
            "4511",
            vec![
                entry(NetworkType::Visa, 4.0, "Miles"),
                entry(NetworkType::Mastercard, 4.0, "Miles"),
            ],
        );
        let wallet = wallet(vec![
            instrument("m", "Venture", NetworkType::Mastercard),
            instrument("v", "Sapphire", NetworkType::Visa),
        ]);

        let result = select("4511", &table, &wallet, PreferenceMode::Rewards).unwrap();
        assert_eq!(result.network, NetworkType::Visa);
        assert_eq!(result.rule, SelectionRule::BestRewardsValue);
    }

    #[test]
    fn test_rewards_fallback_outside_tie_is_ignored() {
        let table = RewardTable::new().with_category(
            "5812",
            vec![
                entry(NetworkType::Amex, 4.0, "Points"),
                entry(NetworkType::Visa, 3.0, "Points"),
            ],
        );
        let visa = instrument("v", "Sapphire", NetworkType::Visa);
        let wallet = wallet(vec![visa.clone(), instrument("a", "Gold", NetworkType::Amex)])
            .with_fallback(visa);

        let result = select("5812", &table, &wallet, PreferenceMode::Rewards).unwrap();
        assert_eq!(result.network, NetworkType::Amex);
        assert_eq!(result.rule, SelectionRule::BestRewardsValue);
    }

    #[test]
    fn test_display_name_comes_from_wallet() {
        let table = RewardTable::new().with_category(
            "5812",
            vec![entry(NetworkType::Amex, 4.0, "Points").with_card_name("Ranking Label")],
        );
        let wallet = wallet(vec![instrument("a", "My Gold Card", NetworkType::Amex)]);

        let result = select("5812", &table, &wallet, PreferenceMode::Rewards).unwrap();
        assert_eq!(result.instrument.display_name, "My Gold Card");
        assert_eq!(result.label(), "My Gold Card (4x Points)");
    }

    #[test]
    fn test_missing_funding_target() {
        let table =
            RewardTable::new().with_category("5812", vec![entry(NetworkType::Amex, 4.0, "Points")]);
        let wallet = wallet(vec![Instrument::new("a", "Gold", NetworkType::Amex)]);

        let result = select("5812", &table, &wallet, PreferenceMode::Rewards);
        let err = result.unwrap_err();
        assert_eq!(
            err,
            NoMatch::UnconfiguredFundingTarget {
                network: NetworkType::Amex
            }
        );
        assert!(err.is_configuration_defect());
    }

    #[test]
    fn test_network_level_funding_target() {
        let table =
            RewardTable::new().with_category("5812", vec![entry(NetworkType::Amex, 4.0, "Points")]);
        let wallet = wallet(vec![Instrument::new("a", "Gold", NetworkType::Amex)])
            .with_funding_target(NetworkType::Amex, FundingTargetId::new("pm_amex"));

        let result = select("5812", &table, &wallet, PreferenceMode::Rewards).unwrap();
        assert_eq!(result.funding_target.as_str(), "pm_amex");
    }

    #[test]
    fn test_candidates_sorted_stably() {
        let table = RewardTable::new().with_category(
            "5411",
            vec![
                entry(NetworkType::Visa, 2.0, "Points"),
                entry(NetworkType::Discover, 5.0, "Cash Back"),
                entry(NetworkType::Amex, 2.0, "Points"),
            ],
        );
        let wallet = wallet(vec![
            instrument("a", "Gold", NetworkType::Amex),
            instrument("d", "It", NetworkType::Discover),
            instrument("v", "Freedom", NetworkType::Visa),
        ]);

        let engine = SelectionEngine::default();
        let candidates = engine
            .candidates("5411", &table, &wallet, PreferenceMode::Rewards)
            .unwrap();
        let order: Vec<NetworkType> = candidates.iter().map(|c| c.entry.network).collect();
        assert_eq!(
            order,
            vec![NetworkType::Discover, NetworkType::Visa, NetworkType::Amex]
        );
    }

    #[test]
    fn test_custom_epsilon_widens_tie() {
        let table = RewardTable::new().with_category(
            "5812",
            vec![
                entry(NetworkType::Visa, 3.0, "Points"),
                entry(NetworkType::Amex, 2.9, "Points"),
            ],
        );
        let amex = instrument("a", "Gold", NetworkType::Amex);
        let wallet = wallet(vec![instrument("v", "Sapphire", NetworkType::Visa), amex.clone()])
            .with_fallback(amex);

        let strict = SelectionEngine::default()
            .select("5812", &table, &wallet, PreferenceMode::Rewards)
            .unwrap();
        assert_eq!(strict.network, NetworkType::Visa);

        let loose = SelectionEngine::new(ValuationParams::default().with_tie_epsilon(0.5))
            .select("5812", &table, &wallet, PreferenceMode::Rewards)
            .unwrap();
        assert_eq!(loose.network, NetworkType::Amex);
        assert_eq!(loose.rule, SelectionRule::FallbackTieBreak);
    }

    #[test]
    fn test_fixture_wallets() {
        use crate::test_utils::{assert_no_match, assert_selected, SelectionAssertion, TestFixtures};

        let table = TestFixtures::default_table();

        let grocery = select("5411", &table, &TestFixtures::full_wallet(), PreferenceMode::Cash);
        assert!(SelectionAssertion::chose(&grocery, NetworkType::Amex));
        assert_eq!(grocery.unwrap().funding_target.as_str(), "pm_amex");

        let dining = assert_selected(
            select(
                "5812",
                &table,
                &TestFixtures::network_funded_wallet(),
                PreferenceMode::Rewards,
            ),
            NetworkType::Amex,
        );
        assert_eq!(dining.funding_target.as_str(), "pm_net_amex");

        let pharmacy = assert_no_match(select(
            "5912",
            &table,
            &TestFixtures::visa_amex_wallet(),
            PreferenceMode::Rewards,
        ));
        assert!(!pharmacy.is_configuration_defect());

        let unfunded = Wallet::new(vec![Instrument::new("9", "Plain Visa", NetworkType::Visa)]);
        let taxi = select("4121", &table, &unfunded, PreferenceMode::Rewards);
        assert!(SelectionAssertion::is_configuration_defect(&taxi));
    }
}
