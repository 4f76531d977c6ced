//! Effective value of a nominal reward under a preference mode.

use super::preferences::{PreferenceMode, ValuationParams};
use crate::model::RewardKind;

/// Effective value with the default valuation constants.
///
/// ```
/// use cardpilot_lib::model::RewardKind;
/// use cardpilot_lib::selection::{effective_value, PreferenceMode};
///
/// let points = RewardKind::new("Points");
/// assert_eq!(effective_value(3.0, &points, PreferenceMode::Cash), 1.5);
/// assert_eq!(effective_value(2.0, &RewardKind::cash(), PreferenceMode::Cash), 2.0);
/// ```
pub fn effective_value(reward_amount: f64, kind: &RewardKind, mode: PreferenceMode) -> f64 {
    effective_value_with(reward_amount, kind, mode, &ValuationParams::default())
}

/// Effective value with explicit valuation constants.
///
/// Pure and total: negative or non-finite inputs clamp to zero.
pub fn effective_value_with(
    reward_amount: f64,
    kind: &RewardKind,
    mode: PreferenceMode,
    params: &ValuationParams,
) -> f64 {
    if !reward_amount.is_finite() || reward_amount <= 0.0 {
        return 0.0;
    }
    reward_amount * params.multiplier(kind.is_cash(), mode)
}
