//! Cardpilot library.
//!
//! Picks the payment card that earns the most for a purchase, given the
//! merchant category, a precomputed reward table, the user's wallet and an
//! optimization preference. The crate is pure decision logic plus the
//! pieces the authorization protocol needs around it: sessions, ranking
//! sources, a funding rail abstraction and configuration.
//!
//! # Features
//!
//! - **Selection engine**: deterministic, tie-break-aware ranking in cash or
//!   rewards mode
//! - **Ranking catalog**: default, custom and per-wallet cached reward tables
//! - **Funding rail**: trait-based charge executor with an HTTP implementation
//!   behind the `http-executor` feature
//!
//! # Example
//!
//! ```
//! use cardpilot_lib::{Instrument, NetworkType, RewardEntry, RewardTable, Wallet};
//! use cardpilot_lib::selection::{SelectionEngine, PreferenceMode};
//!
//! let table = RewardTable::new().with_category(
//!     "4511",
//!     vec![
//!         RewardEntry::new(NetworkType::Visa, 4.0, "Miles").unwrap(),
//!         RewardEntry::new(NetworkType::Mastercard, 4.0, "Miles").unwrap(),
//!     ],
//! );
//! let venture = Instrument::new("7", "Venture", NetworkType::Mastercard)
//!     .with_funding_target("pm_mc");
//! let wallet = Wallet::new(vec![
//!     Instrument::new("2", "Sapphire", NetworkType::Visa).with_funding_target("pm_visa"),
//!     venture.clone(),
//! ])
//! .with_fallback(venture);
//!
//! let chosen = SelectionEngine::default()
//!     .select("4511", &table, &wallet, PreferenceMode::Rewards)
//!     .unwrap();
//! assert_eq!(chosen.network, NetworkType::Mastercard);
//! ```

pub mod config;
pub mod errors;
pub mod funding;
pub mod merchant;
pub mod model;
pub mod prelude;
pub mod rankings;
pub mod selection;
pub mod session;

/// Test utilities: mock funding executor, fixtures and assertions.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::CardpilotConfig;
pub use errors::{CardpilotError, CardpilotErrorCode};
pub use model::{
    FundingTargetId, Instrument, InstrumentId, NetworkType, RewardEntry, RewardKind, RewardTable,
    Wallet,
};
pub use selection::{NoMatch, PreferenceMode, SelectionResult};
pub use session::{SessionContext, SessionRequest};

/// Common result alias for Cardpilot operations.
pub type Result<T> = std::result::Result<T, CardpilotError>;
