//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use cardpilot_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Model types: `Instrument`, `Wallet`, `NetworkType`, `RewardTable`, ...
//! - Selection: `SelectionEngine`, `SelectionResult`, `NoMatch`, `PreferenceMode`
//! - Sessions and rankings: `SessionContext`, `SessionRequest`, `RankingCatalog`
//! - Funding: `FundingExecutor`, `ChargeRequest`, `ChargeReceipt`
//! - Error types: `CardpilotError`, `CardpilotErrorCode`, `Result`

// Model
pub use crate::model::{
    FundingTargetId, Instrument, InstrumentId, NetworkType, RewardEntry, RewardKind, RewardTable,
    Wallet,
};

// Selection
pub use crate::selection::{
    effective_value, select, NoMatch, PreferenceMode, SelectionEngine, SelectionResult,
    SelectionRule, ValuationParams,
};

// Sessions and rankings
pub use crate::rankings::{RankingCatalog, RankingSource, WalletSignature};
pub use crate::session::{SessionContext, SessionRequest};

// Funding
pub use crate::funding::{ChargeReceipt, ChargeRequest, FundingConfig, FundingExecutor, FundingTargets};

// Configuration
pub use crate::config::CardpilotConfig;

// Error handling
pub use crate::errors::{CardpilotError, CardpilotErrorCode};
pub use crate::Result;
