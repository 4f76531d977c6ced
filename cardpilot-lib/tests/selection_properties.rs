//! Property-based tests for the selection engine.

use cardpilot_lib::model::{Instrument, NetworkType, RewardEntry, RewardKind, RewardTable, Wallet};
use cardpilot_lib::selection::{effective_value, select, NoMatch, PreferenceMode};
use proptest::prelude::*;

const KINDS: [&str; 4] = ["Cash Back", "Points", "Miles", "Cash"];

fn network_strategy() -> impl Strategy<Value = NetworkType> {
    (0usize..4).prop_map(|i| NetworkType::ALL[i])
}

fn mode_strategy() -> impl Strategy<Value = PreferenceMode> {
    prop_oneof![Just(PreferenceMode::Cash), Just(PreferenceMode::Rewards)]
}

fn entry_strategy() -> impl Strategy<Value = RewardEntry> {
    (network_strategy(), 1u32..200, 0usize..KINDS.len()).prop_map(|(network, tenths, kind)| {
        RewardEntry::new(network, tenths as f64 / 10.0, KINDS[kind]).unwrap()
    })
}

fn table_strategy() -> impl Strategy<Value = RewardTable> {
    prop::collection::vec(entry_strategy(), 0..6).prop_map(|entries| {
        RewardTable::new().with_category("5812", entries)
    })
}

fn wallet_strategy() -> impl Strategy<Value = Wallet> {
    (
        prop::collection::vec(network_strategy(), 1..5),
        prop::option::of(0usize..4),
    )
        .prop_map(|(networks, fallback)| {
            let instruments: Vec<Instrument> = networks
                .iter()
                .enumerate()
                .map(|(i, network)| {
                    Instrument::new(format!("card{}", i), format!("Card {}", i), *network)
                        .with_funding_target(format!("pm_{}", i))
                })
                .collect();
            let fallback = fallback.and_then(|i| instruments.get(i).cloned());
            let wallet = Wallet::new(instruments);
            match fallback {
                Some(f) => wallet.with_fallback(f),
                None => wallet,
            }
        })
}

proptest! {
    /// Effective value never decreases as the nominal amount grows.
    #[test]
    fn effective_value_monotonic(
        a in 0.0f64..100.0,
        b in 0.0f64..100.0,
        kind in 0usize..KINDS.len(),
        mode in mode_strategy()
    ) {
        let kind = RewardKind::new(KINDS[kind]);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(effective_value(lo, &kind, mode) <= effective_value(hi, &kind, mode));
    }

    /// Effective value is never negative.
    #[test]
    fn effective_value_non_negative(amount in -100.0f64..100.0, kind in 0usize..KINDS.len(), mode in mode_strategy()) {
        prop_assert!(effective_value(amount, &RewardKind::new(KINDS[kind]), mode) >= 0.0);
    }

    /// Categories absent from the table never match.
    #[test]
    fn absent_category_is_no_match(table in table_strategy(), wallet in wallet_strategy(), mode in mode_strategy()) {
        let result = select("9999", &table, &wallet, mode);
        prop_assert_eq!(result, Err(NoMatch::NoRankingData { mcc: "9999".into() }));
    }

    /// A wallet with no network in the ranking never matches.
    #[test]
    fn zero_overlap_is_no_match(entries in prop::collection::vec(entry_strategy(), 1..6), mode in mode_strategy()) {
        let held: Vec<NetworkType> = entries.iter().map(|e| e.network).collect();
        let missing: Vec<NetworkType> = NetworkType::ALL
            .into_iter()
            .filter(|n| !held.contains(n))
            .collect();
        prop_assume!(!missing.is_empty());

        let table = RewardTable::new().with_category("5812", entries);
        let wallet = Wallet::new(
            missing
                .iter()
                .map(|n| Instrument::new(n.as_str(), n.as_str(), *n).with_funding_target("pm"))
                .collect(),
        );

        let result = select("5812", &table, &wallet, mode);
        prop_assert_eq!(result, Err(NoMatch::NoEligibleInstrument { mcc: "5812".into() }));
    }

    /// Same inputs, same answer.
    #[test]
    fn select_is_pure(table in table_strategy(), wallet in wallet_strategy(), mode in mode_strategy()) {
        let first = select("5812", &table, &wallet, mode);
        let second = select("5812", &table, &wallet, mode);
        prop_assert_eq!(first, second);
    }

    /// The chosen instrument is always one the wallet holds.
    #[test]
    fn selection_stays_in_wallet(table in table_strategy(), wallet in wallet_strategy(), mode in mode_strategy()) {
        if let Ok(result) = select("5812", &table, &wallet, mode) {
            prop_assert!(wallet.holds(&result.instrument));
            prop_assert_eq!(result.instrument.network, result.network);
        }
    }
}
