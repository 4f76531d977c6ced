//! Error types for Cardpilot operations.
//!
//! Selection outcomes are not errors: the engine reports "no match" as a
//! [`crate::selection::NoMatch`] value. The types here cover malformed input,
//! configuration problems and funding rail faults.

/// Error codes for embedding and dashboard integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CardpilotErrorCode {
    /// Feature not compiled in
    Unimplemented = 1000,
    /// Transport/network layer error
    Transport = 2000,
    /// Connection failed
    ConnectionFailed = 2001,
    /// Connection timeout
    ConnectionTimeout = 2002,
    /// Resource not found
    NotFound = 4000,
    /// Network label could not be mapped to a known network
    UnknownNetwork = 4001,
    /// Invalid request/data
    InvalidData = 5000,
    /// Configuration rejected
    Config = 5001,
    /// Serialization error
    Serialization = 5002,
    /// Funding charge rejected by the rail
    ChargeRejected = 6000,
    /// Rate limited
    RateLimited = 8000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Error type for Cardpilot operations.
#[derive(Debug, thiserror::Error)]
pub enum CardpilotError {
    /// Feature not compiled in.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    /// Transport/network layer error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Connection failed.
    #[error("connection to {target} failed: {reason}")]
    ConnectionFailed {
        /// Target endpoint or service
        target: String,
        /// Underlying error message
        reason: String,
    },

    /// Connection timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Resource not found (ranking file, category, instrument).
    #[error("{resource_type} not found: {identifier}")]
    NotFound {
        /// Type of resource
        resource_type: String,
        /// Resource identifier
        identifier: String,
    },

    /// A network label that does not canonicalize.
    #[error("unknown card network: {0}")]
    UnknownNetwork(String),

    /// Invalid data provided.
    #[error("invalid {field}: {reason}")]
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The funding rail declined the charge.
    #[error("charge against {funding_target} rejected: {reason}")]
    ChargeRejected {
        /// Funding target that was charged
        funding_target: String,
        /// Rail-provided reason
        reason: String,
    },

    /// Rate limited by the funding rail.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds
        retry_after_ms: u64,
    },

    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CardpilotError {
    /// Get the error code.
    pub fn code(&self) -> CardpilotErrorCode {
        match self {
            Self::Unimplemented(_) => CardpilotErrorCode::Unimplemented,
            Self::Transport(_) => CardpilotErrorCode::Transport,
            Self::ConnectionFailed { .. } => CardpilotErrorCode::ConnectionFailed,
            Self::ConnectionTimeout { .. } => CardpilotErrorCode::ConnectionTimeout,
            Self::NotFound { .. } => CardpilotErrorCode::NotFound,
            Self::UnknownNetwork(_) => CardpilotErrorCode::UnknownNetwork,
            Self::InvalidData { .. } => CardpilotErrorCode::InvalidData,
            Self::Config(_) => CardpilotErrorCode::Config,
            Self::Serialization(_) => CardpilotErrorCode::Serialization,
            Self::ChargeRejected { .. } => CardpilotErrorCode::ChargeRejected,
            Self::RateLimited { .. } => CardpilotErrorCode::RateLimited,
            Self::Internal(_) => CardpilotErrorCode::Internal,
        }
    }

    /// Returns true if a caller could reasonably retry.
    ///
    /// The authorization protocol never retries funding on its own; this is
    /// informational for out-of-band reconciliation tooling.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::RateLimited { .. }
        )
    }

    /// Create a not found error.
    pub fn not_found(resource_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CardpilotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CardpilotError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("io: {}", err))
    }
}
