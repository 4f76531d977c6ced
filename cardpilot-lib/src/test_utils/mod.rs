//! Test utilities for Cardpilot.
//!
//! - A mock funding executor with configurable behavior
//! - Fixtures: sample wallets and reward tables
//! - Assertion helpers for selection outcomes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cardpilot_lib::test_utils::{MockFundingExecutor, TestFixtures};
//!
//! let funding = MockFundingExecutor::failing("card_declined");
//! let table = TestFixtures::dining_table();
//! let wallet = TestFixtures::visa_amex_wallet();
//! ```

mod assertions;
mod fixtures;
mod mock_funding;

pub use assertions::{assert_no_match, assert_selected, SelectionAssertion};
pub use fixtures::TestFixtures;
pub use mock_funding::{ChargeBehavior, MockFundingExecutor};
