//! Instrument Selection
//!
//! Given a merchant category code, a reward table, the user's wallet and a
//! preference mode, pick the single instrument with the best effective
//! reward value, or report why none qualifies.
//!
//! # Example
//!
//! ```
//! use cardpilot_lib::model::{Instrument, NetworkType, RewardEntry, RewardTable, Wallet};
//! use cardpilot_lib::selection::{select, PreferenceMode};
//!
//! let table = RewardTable::new().with_category(
//!     "5812",
//!     vec![
//!         RewardEntry::new(NetworkType::Visa, 3.0, "Points").unwrap(),
//!         RewardEntry::new(NetworkType::Amex, 2.0, "Cash").unwrap(),
//!     ],
//! );
//! let wallet = Wallet::new(vec![
//!     Instrument::new("v", "Sapphire", NetworkType::Visa).with_funding_target("pm_visa"),
//!     Instrument::new("a", "Blue Cash", NetworkType::Amex).with_funding_target("pm_amex"),
//! ]);
//!
//! let chosen = select("5812", &table, &wallet, PreferenceMode::Cash).unwrap();
//! assert_eq!(chosen.instrument.display_name, "Blue Cash");
//! ```
//!
//! # Modes
//!
//! - **Cash**: non-cash rewards are devalued, so they need to be at least
//!   twice as large to beat cash back. With no cash entry eligible, the
//!   fallback instrument's network wins if it is eligible.
//! - **Rewards**: non-cash rewards carry a premium. When several entries tie
//!   at the top, the fallback instrument breaks the tie.

mod preferences;
mod selector;
mod value;

pub use preferences::{PreferenceMode, ValuationParams};
pub use selector::{select, Candidate, NoMatch, SelectionEngine, SelectionResult, SelectionRule};
pub use value::{effective_value, effective_value_with};
