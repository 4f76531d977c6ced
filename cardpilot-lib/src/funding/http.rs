//! HTTP funding executor.
//!
//! Charges a saved payment method by creating a confirmed, off-session
//! payment intent:
//!
//! ```text
//! POST {api_url}/v1/payment_intents
//! Authorization: Bearer {secret_key}
//! Idempotency-Key: {request id}
//!
//! amount=1250&currency=usd&customer=cus_..&payment_method=pm_..&confirm=true&off_session=true
//! ```
//!
//! # Feature Flags
//!
//! Requires the `http-executor` feature for real HTTP requests. Without it,
//! every charge returns an `Unimplemented` error.
//!
//! ```toml
//! [dependencies]
//! cardpilot-lib = { version = "0.1", features = ["http-executor"] }
//! ```

use async_trait::async_trait;
#[cfg(any(feature = "http-executor", test))]
use serde::Deserialize;
#[cfg(feature = "http-executor")]
use std::time::Duration;

use super::config::FundingConfig;
use super::{ChargeReceipt, ChargeRequest, FundingExecutor};
use crate::{CardpilotError, Result};

/// Payment intent as returned by the rail.
#[cfg(any(feature = "http-executor", test))]
#[derive(Clone, Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    status: String,
    #[serde(default)]
    amount: Option<u64>,
    #[serde(default)]
    created: Option<i64>,
}

/// Error envelope returned by the rail on non-2xx responses.
#[cfg(any(feature = "http-executor", test))]
#[derive(Clone, Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[cfg(any(feature = "http-executor", test))]
#[derive(Clone, Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[cfg(any(feature = "http-executor", test))]
impl ErrorEnvelope {
    fn reason(text: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(text) {
            Ok(envelope) => match (envelope.error.code, envelope.error.message) {
                (Some(code), Some(message)) => format!("{}: {}", code, message),
                (Some(code), None) => code,
                (None, Some(message)) => message,
                (None, None) => text.to_string(),
            },
            Err(_) => text.to_string(),
        }
    }
}

/// Funding executor backed by a payment-intents HTTP API.
pub struct HttpFundingExecutor {
    config: FundingConfig,
    #[cfg(feature = "http-executor")]
    client: reqwest::Client,
}

impl HttpFundingExecutor {
    /// Create a new executor with the given configuration.
    #[cfg(feature = "http-executor")]
    pub fn new(config: FundingConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CardpilotError::Internal(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create a new executor (stub when feature disabled).
    #[cfg(not(feature = "http-executor"))]
    pub fn new(config: FundingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Whether the HTTP client is compiled in. Without it every charge
    /// fails with `Unimplemented`.
    pub const fn is_available() -> bool {
        cfg!(feature = "http-executor")
    }

    /// Get the configuration.
    pub fn config(&self) -> &FundingConfig {
        &self.config
    }

    #[cfg(any(feature = "http-executor", test))]
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    #[cfg(any(feature = "http-executor", test))]
    fn receipt(intent: PaymentIntent, request: &ChargeRequest) -> ChargeReceipt {
        ChargeReceipt {
            charge_id: intent.id,
            status: intent.status,
            amount_minor_units: intent.amount.unwrap_or(request.amount_minor_units),
            charged_at: intent
                .created
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
        }
    }

    #[cfg(feature = "http-executor")]
    async fn create_payment_intent(&self, request: &ChargeRequest) -> Result<ChargeReceipt> {
        let amount = request.amount_minor_units.to_string();
        let currency = if request.currency.is_empty() {
            self.config.currency.as_str()
        } else {
            request.currency.as_str()
        };
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("customer", self.config.customer_id.as_str()),
            ("payment_method", request.funding_target.as_str()),
            ("confirm", "true"),
            ("off_session", "true"),
        ];

        let response = self
            .client
            .post(self.url("v1/payment_intents"))
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CardpilotError::Serialization(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(self.map_status_error(status.as_u16(), &text, request));
        }

        let intent: PaymentIntent = serde_json::from_str(&text).map_err(|e| {
            CardpilotError::Serialization(format!("Failed to parse payment intent: {}", e))
        })?;

        match intent.status.as_str() {
            "succeeded" | "processing" => Ok(Self::receipt(intent, request)),
            other => Err(CardpilotError::ChargeRejected {
                funding_target: request.funding_target.to_string(),
                reason: format!("payment intent {} ended in status {}", intent.id, other),
            }),
        }
    }

    /// Map HTTP status codes to CardpilotError.
    #[cfg(feature = "http-executor")]
    fn map_status_error(
        &self,
        status: u16,
        error_text: &str,
        request: &ChargeRequest,
    ) -> CardpilotError {
        let reason = ErrorEnvelope::reason(error_text);
        match status {
            400 => CardpilotError::InvalidData {
                field: "charge".to_string(),
                reason,
            },
            401 | 403 => CardpilotError::Config(format!("funding rail rejected credentials: {}", reason)),
            402 => CardpilotError::ChargeRejected {
                funding_target: request.funding_target.to_string(),
                reason,
            },
            404 => CardpilotError::NotFound {
                resource_type: "funding target".to_string(),
                identifier: request.funding_target.to_string(),
            },
            429 => CardpilotError::RateLimited {
                retry_after_ms: 1000,
            },
            500..=599 => {
                CardpilotError::Internal(format!("Funding rail error ({}): {}", status, reason))
            }
            _ => CardpilotError::Transport(format!(
                "Funding request failed ({}): {}",
                status, reason
            )),
        }
    }

    /// Map reqwest errors to CardpilotError.
    #[cfg(feature = "http-executor")]
    fn map_reqwest_error(&self, e: reqwest::Error) -> CardpilotError {
        if e.is_timeout() {
            CardpilotError::ConnectionTimeout {
                operation: "funding charge".to_string(),
                timeout_ms: self.config.timeout_secs * 1000,
            }
        } else if e.is_connect() {
            CardpilotError::ConnectionFailed {
                target: self.config.api_url.clone(),
                reason: e.to_string(),
            }
        } else {
            CardpilotError::Transport(format!("Funding request failed: {}", e))
        }
    }
}

#[async_trait]
impl FundingExecutor for HttpFundingExecutor {
    #[cfg(feature = "http-executor")]
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip(self, request),
            fields(target = %request.funding_target, amount = request.amount_minor_units)
        )
    )]
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt> {
        self.create_payment_intent(request).await
    }

    #[cfg(not(feature = "http-executor"))]
    async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeReceipt> {
        Err(CardpilotError::Unimplemented(
            "HTTP funding client not compiled - enable the 'http-executor' feature",
        ))
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FundingTargetId;

    #[test]
    fn test_url_building() {
        let executor = HttpFundingExecutor::new(
            FundingConfig::new("sk_test", "cus_1").with_api_url("http://localhost:12111/"),
        )
        .unwrap();
        assert_eq!(
            executor.url("v1/payment_intents"),
            "http://localhost:12111/v1/payment_intents"
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(HttpFundingExecutor::new(FundingConfig::new("", "cus_1")).is_err());
    }

    #[test]
    fn test_error_reason_extraction() {
        let text = r#"{"error": {"code": "card_declined", "message": "Your card was declined."}}"#;
        assert_eq!(
            ErrorEnvelope::reason(text),
            "card_declined: Your card was declined."
        );
        assert_eq!(ErrorEnvelope::reason("gateway down"), "gateway down");
    }

    #[test]
    fn test_receipt_falls_back_to_request_amount() {
        let request = ChargeRequest::new(999, FundingTargetId::new("pm_1"), "auth_1");
        let receipt = HttpFundingExecutor::receipt(
            PaymentIntent {
                id: "pi_1".into(),
                status: "succeeded".into(),
                amount: None,
                created: Some(1_700_000_000),
            },
            &request,
        );
        assert_eq!(receipt.amount_minor_units, 999);
        assert_eq!(receipt.charged_at, 1_700_000_000);
    }

    #[cfg(not(feature = "http-executor"))]
    #[tokio::test]
    async fn test_stub_returns_unimplemented() {
        let executor = HttpFundingExecutor::new(FundingConfig::new("sk", "cus")).unwrap();
        let request = ChargeRequest::new(100, FundingTargetId::new("pm_1"), "auth_1");
        let err = executor.charge(&request).await.unwrap_err();
        assert_eq!(err.code(), crate::CardpilotErrorCode::Unimplemented);
        assert!(!HttpFundingExecutor::is_available());
    }
}
