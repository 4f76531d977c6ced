//! Cardpilot Interactive Layer
//!
//! This crate implements the approve-then-fund authorization protocol:
//! an incoming authorization request is answered within its time budget
//! using the selection engine, and only after an approval has been decided
//! is a funding charge dispatched in the background. Funding failures are
//! recorded and logged, never used to retract an approval.

use cardpilot_lib::merchant;
use cardpilot_lib::{CardpilotError, NoMatch, SelectionResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod audit;
pub mod funding;
pub mod ledger;
pub mod manager;
pub mod metrics;

pub use audit::{AuditEvent, AuditEventKind, AuditLog};
pub use funding::{FundingRecord, FundingStatus, FundingTracker};
pub use ledger::{Admission, RequestLedger};
pub use manager::{AuthorizationManager, PruneReport};
pub use metrics::{Metrics, MetricsSnapshot};

/// Event type of an authorization request.
pub const AUTHORIZATION_REQUEST_EVENT: &str = "issuing_authorization.request";

/// A validated authorization request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Requester-assigned id; duplicates share it.
    pub request_id: String,
    /// Merchant category code.
    pub mcc: String,
    /// Amount in minor currency units.
    pub amount_minor_units: u64,
    /// Decision deadline; the manager default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,
}

impl AuthorizationRequest {
    /// Create a request with the manager's default time budget.
    pub fn new(
        request_id: impl Into<String>,
        mcc: impl Into<String>,
        amount_minor_units: u64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            mcc: mcc.into(),
            amount_minor_units,
            time_budget_ms: None,
        }
    }

    /// Set an explicit time budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_ms = Some(budget.as_millis() as u64);
        self
    }

    /// The explicit time budget, if any.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    /// Reject requests missing an id, a category or an amount.
    pub fn validate(&self) -> Result<()> {
        if self.request_id.trim().is_empty() {
            return Err(InteractiveError::malformed("request_id", "missing"));
        }
        if self.mcc.trim().is_empty() {
            return Err(InteractiveError::malformed("mcc", "missing"));
        }
        if self.amount_minor_units == 0 {
            return Err(InteractiveError::malformed("amount", "must be positive"));
        }
        Ok(())
    }
}

/// Merchant details on an incoming authorization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MerchantData {
    /// Merchant category code.
    #[serde(default)]
    pub category_code: Option<String>,
    /// Rail category name ("eating_places_restaurants").
    #[serde(default)]
    pub category: Option<String>,
    /// Merchant descriptor.
    #[serde(default)]
    pub name: Option<String>,
}

/// Amount details of the pending request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Amount in minor units.
    #[serde(default)]
    pub amount: Option<i64>,
}

/// An authorization object as delivered by the card issuer, unvalidated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IncomingAuthorization {
    /// Authorization id.
    #[serde(default)]
    pub id: Option<String>,
    /// Amount of the pending request.
    #[serde(default)]
    pub pending_request: Option<PendingRequest>,
    /// Authorization amount, used when there is no pending request amount.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Merchant details.
    #[serde(default)]
    pub merchant_data: Option<MerchantData>,
}

impl IncomingAuthorization {
    /// Validate into an [`AuthorizationRequest`].
    pub fn into_request(self) -> Result<AuthorizationRequest> {
        let request_id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| InteractiveError::malformed("id", "missing"))?;

        let amount = self
            .pending_request
            .and_then(|p| p.amount)
            .or(self.amount)
            .ok_or_else(|| InteractiveError::malformed("amount", "missing"))?;
        let amount_minor_units = u64::try_from(amount)
            .ok()
            .filter(|a| *a > 0)
            .ok_or_else(|| InteractiveError::malformed("amount", "must be positive"))?;

        let merchant = self.merchant_data.unwrap_or_default();
        let mcc = merchant
            .category_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .or_else(|| {
                merchant
                    .category
                    .as_deref()
                    .and_then(merchant::by_name)
                    .map(|c| c.mcc.to_string())
            })
            .ok_or_else(|| InteractiveError::malformed("merchant_data.category_code", "missing"))?;

        Ok(AuthorizationRequest::new(request_id, mcc, amount_minor_units))
    }
}

/// Payload of an issuer event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventData {
    /// The event object.
    #[serde(default)]
    pub object: serde_json::Value,
}

/// Issuer event envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuerEvent {
    /// Event id.
    #[serde(default)]
    pub id: Option<String>,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    #[serde(default)]
    pub data: EventData,
}

/// Why a decision came out the way it did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DecisionReason {
    /// An instrument was selected.
    Selected,
    /// The selection engine found no match.
    NoMatch {
        /// Engine outcome.
        cause: NoMatch,
    },
    /// The time budget expired before a decision was produced.
    DeadlineExceeded,
    /// The selection task failed to run.
    EngineUnavailable,
    /// Same request id is still being decided by an earlier delivery.
    DuplicateInFlight,
}

/// The answer to one authorization request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    /// Request id.
    pub request_id: String,
    /// Approve or decline; irrevocable once returned.
    pub approved: bool,
    /// Why.
    #[serde(flatten)]
    pub reason: DecisionReason,
    /// Selection behind an approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionResult>,
    /// Whether this answers a duplicate delivery.
    #[serde(default)]
    pub duplicate: bool,
    /// Unix timestamp of the decision.
    pub decided_at: i64,
}

impl AuthorizationDecision {
    /// An approval for `selection`.
    pub fn approve(request_id: impl Into<String>, selection: SelectionResult) -> Self {
        Self {
            request_id: request_id.into(),
            approved: true,
            reason: DecisionReason::Selected,
            selection: Some(selection),
            duplicate: false,
            decided_at: chrono::Utc::now().timestamp(),
        }
    }

    /// A decline.
    pub fn decline(request_id: impl Into<String>, reason: DecisionReason) -> Self {
        Self {
            request_id: request_id.into(),
            approved: false,
            reason,
            selection: None,
            duplicate: false,
            decided_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Flag as the answer to a duplicate delivery.
    pub fn as_duplicate(mut self) -> Self {
        self.duplicate = true;
        self
    }

    /// What the requester sees.
    pub fn response(&self) -> AuthorizationResponse {
        AuthorizationResponse {
            approved: self.approved,
        }
    }
}

/// Wire response to the requester: approved or declined, nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    /// Approve or decline.
    pub approved: bool,
}

/// Result of handling an issuer event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    /// An authorization request was decided.
    Decided {
        /// The decision.
        decision: AuthorizationDecision,
    },
    /// A non-authorization event was acknowledged without side effects.
    Acknowledged {
        /// Event type.
        event_type: String,
    },
}

/// Result type for interactive operations.
pub type Result<T> = std::result::Result<T, InteractiveError>;

/// Errors surfaced by the protocol layer.
#[derive(thiserror::Error, Debug)]
pub enum InteractiveError {
    /// The request is missing or has an invalid field; nothing was attempted.
    #[error("malformed request: {field}: {reason}")]
    MalformedRequest {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(#[source] CardpilotError),
    /// A session could not be started.
    #[error("session rejected: {0}")]
    Session(#[source] CardpilotError),
    /// The funding rail could not be set up or settled.
    #[error("funding error: {0}")]
    Funding(String),
    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl InteractiveError {
    /// Create a malformed request error.
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for InteractiveError {
    fn from(e: serde_json::Error) -> Self {
        InteractiveError::malformed("body", e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_authorization_parses() {
        let incoming: IncomingAuthorization = serde_json::from_value(serde_json::json!({
            "id": "iauth_1",
            "pending_request": {"amount": 4250},
            "merchant_data": {"category_code": "5812", "name": "Corner Bistro"}
        }))
        .unwrap();

        let request = incoming.into_request().unwrap();
        assert_eq!(request.request_id, "iauth_1");
        assert_eq!(request.mcc, "5812");
        assert_eq!(request.amount_minor_units, 4250);
        assert!(request.time_budget().is_none());
    }

    #[test]
    fn test_category_name_resolves_mcc() {
        let incoming = IncomingAuthorization {
            id: Some("iauth_2".into()),
            amount: Some(100),
            merchant_data: Some(MerchantData {
                category: Some("airlines_air_carriers".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(incoming.into_request().unwrap().mcc, "4511");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let no_amount = IncomingAuthorization {
            id: Some("iauth_3".into()),
            merchant_data: Some(MerchantData {
                category_code: Some("5812".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            no_amount.into_request(),
            Err(InteractiveError::MalformedRequest { field, .. }) if field == "amount"
        ));

        let no_category = IncomingAuthorization {
            id: Some("iauth_4".into()),
            amount: Some(100),
            ..Default::default()
        };
        assert!(matches!(
            no_category.into_request(),
            Err(InteractiveError::MalformedRequest { field, .. }) if field.starts_with("merchant_data")
        ));

        let negative = IncomingAuthorization {
            id: Some("iauth_5".into()),
            amount: Some(-5),
            merchant_data: Some(MerchantData {
                category_code: Some("5812".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(negative.into_request().is_err());
    }

    #[test]
    fn test_request_validation() {
        assert!(AuthorizationRequest::new("r1", "5812", 100).validate().is_ok());
        assert!(AuthorizationRequest::new("", "5812", 100).validate().is_err());
        assert!(AuthorizationRequest::new("r1", " ", 100).validate().is_err());
        assert!(AuthorizationRequest::new("r1", "5812", 0).validate().is_err());
    }

    #[test]
    fn test_decision_serialization() {
        let decision = AuthorizationDecision::decline("r1", DecisionReason::DeadlineExceeded);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["approved"], false);
        assert_eq!(json["reason"], "deadline_exceeded");
        assert_eq!(
            serde_json::to_value(decision.response()).unwrap(),
            serde_json::json!({"approved": false})
        );
    }

    #[test]
    fn test_event_envelope() {
        let event: IssuerEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "issuing_card.created",
            "data": {"object": {}}
        }))
        .unwrap();
        assert_eq!(event.event_type, "issuing_card.created");
    }
}
