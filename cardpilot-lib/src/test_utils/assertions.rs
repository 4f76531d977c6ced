//! Assertion helpers for selection outcomes.

use crate::model::NetworkType;
use crate::selection::{NoMatch, SelectionResult};

/// Predicate helpers for selection results.
pub struct SelectionAssertion;

impl SelectionAssertion {
    /// Whether the result chose `network`.
    pub fn chose(result: &Result<SelectionResult, NoMatch>, network: NetworkType) -> bool {
        matches!(result, Ok(r) if r.network == network)
    }

    /// Whether the result is a decline that should be reported to operators.
    pub fn is_configuration_defect(result: &Result<SelectionResult, NoMatch>) -> bool {
        matches!(result, Err(no_match) if no_match.is_configuration_defect())
    }
}

/// Assert that a selection chose `network` and return the result.
///
/// # Panics
/// Panics on a no-match or a different network.
pub fn assert_selected(
    result: Result<SelectionResult, NoMatch>,
    network: NetworkType,
) -> SelectionResult {
    match result {
        Ok(selected) => {
            assert_eq!(
                selected.network, network,
                "expected {} to be selected, got {} ({})",
                network, selected.network, selected.reason
            );
            selected
        }
        Err(no_match) => panic!("expected {} to be selected, got no match: {}", network, no_match),
    }
}

/// Assert that a selection produced no match and return the reason.
///
/// # Panics
/// Panics if an instrument was selected.
pub fn assert_no_match(result: Result<SelectionResult, NoMatch>) -> NoMatch {
    match result {
        Ok(selected) => panic!(
            "expected no match, got {} ({})",
            selected.network, selected.reason
        ),
        Err(no_match) => no_match,
    }
}
