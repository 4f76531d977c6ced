//! Mock funding executor.

use crate::funding::{ChargeReceipt, ChargeRequest, FundingExecutor};
use crate::{CardpilotError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How the mock answers a charge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChargeBehavior {
    /// Confirm every charge.
    Succeed,
    /// Reject every charge with this reason.
    Reject(String),
}

/// Records every charge and answers according to its [`ChargeBehavior`].
#[derive(Debug)]
pub struct MockFundingExecutor {
    behavior: Mutex<ChargeBehavior>,
    delay: Duration,
    charges: Mutex<Vec<ChargeRequest>>,
    counter: AtomicU64,
}

impl MockFundingExecutor {
    /// A mock that confirms every charge.
    pub fn succeeding() -> Self {
        Self::with_behavior(ChargeBehavior::Succeed)
    }

    /// A mock that rejects every charge.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behavior(ChargeBehavior::Reject(reason.into()))
    }

    /// A mock with explicit behavior.
    pub fn with_behavior(behavior: ChargeBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            delay: Duration::ZERO,
            charges: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change behavior for subsequent charges.
    pub fn set_behavior(&self, behavior: ChargeBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Charges received so far, in arrival order.
    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().unwrap().clone()
    }

    /// Number of charges received.
    pub fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }
}

impl Default for MockFundingExecutor {
    fn default() -> Self {
        Self::succeeding()
    }
}

#[async_trait]
impl FundingExecutor for MockFundingExecutor {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt> {
        self.charges.lock().unwrap().push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            ChargeBehavior::Succeed => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(ChargeReceipt {
                    charge_id: format!("pi_mock_{}", n),
                    status: "succeeded".to_string(),
                    amount_minor_units: request.amount_minor_units,
                    charged_at: chrono::Utc::now().timestamp(),
                })
            }
            ChargeBehavior::Reject(reason) => Err(CardpilotError::ChargeRejected {
                funding_target: request.funding_target.to_string(),
                reason,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
