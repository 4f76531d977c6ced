//! Shared helpers for protocol tests.

use cardpilot_interactive::AuthorizationManager;
use cardpilot_lib::prelude::{RankingCatalog, RewardTable, SessionRequest};
use cardpilot_lib::session::{PoolCard, PoolCardId};
use cardpilot_lib::test_utils::MockFundingExecutor;
use std::sync::Arc;

/// Manager over `table` charging through `executor`. The returned handle
/// observes the same mock.
pub fn manager_with(
    executor: MockFundingExecutor,
    table: RewardTable,
) -> (AuthorizationManager, Arc<MockFundingExecutor>) {
    let executor = Arc::new(executor);
    let catalog = RankingCatalog::new(table);
    let manager = AuthorizationManager::new(Arc::new(catalog), executor.clone());
    (manager, executor)
}

/// Pool card for a network key, funded at `pm_<network>`.
pub fn pool_card(network: &str) -> PoolCard {
    let id = match network {
        "visa" => 2,
        "mastercard" => 7,
        "amex" => 4,
        "discover" => 16,
        _ => 99,
    };
    PoolCard {
        id: Some(PoolCardId::Number(id)),
        card_name: Some(format!("{} card", network)),
        card_type: None,
        card_key: Some(network.to_string()),
        funding_target: Some(format!("pm_{}", network)),
    }
}

/// Session request over the given networks.
pub fn session_request(networks: &[&str], fallback: Option<&str>, mode: &str) -> SessionRequest {
    SessionRequest {
        selected_cards: Some(networks.iter().map(|n| pool_card(n)).collect()),
        backup_card: fallback.map(pool_card),
        optimization_preference: Some(mode.to_string()),
    }
}
