//! Data model shared by the selection engine and the authorization protocol.

mod instrument;
mod network;
mod rewards;

pub use instrument::{FundingTargetId, Instrument, InstrumentId, Wallet};
pub use network::NetworkType;
pub use rewards::{RankedCard, RewardEntry, RewardKind, RewardTable};
