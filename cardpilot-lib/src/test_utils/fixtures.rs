//! Sample wallets and reward tables.

use crate::model::{FundingTargetId, Instrument, NetworkType, RewardEntry, RewardTable, Wallet};

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Sample authorization amounts in cents.
    pub const SAMPLE_AMOUNTS: &'static [u64] = &[
        150,     // coffee
        4_250,   // dinner
        12_999,  // groceries
        89_000,  // flight
    ];

    /// Visa instrument with its own funding target.
    pub fn visa() -> Instrument {
        Instrument::new("2", "Chase Sapphire Preferred", NetworkType::Visa)
            .with_funding_target("pm_visa")
    }

    /// Mastercard instrument with its own funding target.
    pub fn mastercard() -> Instrument {
        Instrument::new("7", "Capital One Venture", NetworkType::Mastercard)
            .with_funding_target("pm_mastercard")
    }

    /// Amex instrument with its own funding target.
    pub fn amex() -> Instrument {
        Instrument::new("4", "American Express Gold Card", NetworkType::Amex)
            .with_funding_target("pm_amex")
    }

    /// Discover instrument with its own funding target.
    pub fn discover() -> Instrument {
        Instrument::new("16", "Discover it Cash Back", NetworkType::Discover)
            .with_funding_target("pm_discover")
    }

    /// Visa + Amex, no fallback.
    pub fn visa_amex_wallet() -> Wallet {
        Wallet::new(vec![Self::visa(), Self::amex()])
    }

    /// Visa + Mastercard with Mastercard as fallback.
    pub fn visa_mastercard_fallback_wallet() -> Wallet {
        Wallet::new(vec![Self::visa(), Self::mastercard()]).with_fallback(Self::mastercard())
    }

    /// All four networks, Discover as fallback.
    pub fn full_wallet() -> Wallet {
        Wallet::new(vec![
            Self::visa(),
            Self::mastercard(),
            Self::amex(),
            Self::discover(),
        ])
        .with_fallback(Self::discover())
    }

    /// Wallet whose instruments rely on network-level funding targets.
    pub fn network_funded_wallet() -> Wallet {
        Wallet::new(vec![
            Instrument::new("2", "Chase Sapphire Preferred", NetworkType::Visa),
            Instrument::new("4", "American Express Gold Card", NetworkType::Amex),
        ])
        .with_funding_target(NetworkType::Visa, FundingTargetId::new("pm_net_visa"))
        .with_funding_target(NetworkType::Amex, FundingTargetId::new("pm_net_amex"))
    }

    /// 5812: visa 3x points, amex 2x cash.
    pub fn dining_table() -> RewardTable {
        RewardTable::new().with_category(
            "5812",
            vec![
                entry(NetworkType::Visa, 3.0, "Points"),
                entry(NetworkType::Amex, 2.0, "Cash"),
            ],
        )
    }

    /// 4511: visa 4x miles, mastercard 4x miles.
    pub fn travel_tie_table() -> RewardTable {
        RewardTable::new().with_category(
            "4511",
            vec![
                entry(NetworkType::Visa, 4.0, "Miles"),
                entry(NetworkType::Mastercard, 4.0, "Miles"),
            ],
        )
    }

    /// Several categories over all four networks.
    pub fn default_table() -> RewardTable {
        RewardTable::new()
            .with_category(
                "5812",
                vec![
                    entry(NetworkType::Amex, 4.0, "Points"),
                    entry(NetworkType::Visa, 3.0, "Points"),
                    entry(NetworkType::Mastercard, 3.0, "Cash Back"),
                ],
            )
            .with_category(
                "4511",
                vec![
                    entry(NetworkType::Visa, 5.0, "Points"),
                    entry(NetworkType::Amex, 5.0, "Points"),
                    entry(NetworkType::Mastercard, 2.0, "Miles"),
                ],
            )
            .with_category(
                "5411",
                vec![
                    entry(NetworkType::Amex, 6.0, "Cash Back"),
                    entry(NetworkType::Discover, 5.0, "Cash Back"),
                ],
            )
            .with_category(
                "5541",
                vec![
                    entry(NetworkType::Discover, 5.0, "Cash Back"),
                    entry(NetworkType::Amex, 3.0, "Cash Back"),
                ],
            )
            .with_category(
                "4121",
                vec![
                    entry(NetworkType::Visa, 3.0, "Points"),
                    entry(NetworkType::Mastercard, 2.0, "Miles"),
                ],
            )
            .with_category(
                "5912",
                vec![entry(NetworkType::Discover, 5.0, "Cash Back")],
            )
    }

    /// Get a sample amount.
    pub fn sample_amount(index: usize) -> u64 {
        Self::SAMPLE_AMOUNTS[index % Self::SAMPLE_AMOUNTS.len()]
    }
}

fn entry(network: NetworkType, amount: f64, kind: &str) -> RewardEntry {
    RewardEntry::new(network, amount, kind).unwrap()
}
