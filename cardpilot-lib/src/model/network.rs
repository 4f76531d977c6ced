//! Card network keys.
//!
//! Every string label that names a card network (wallet card types, ranking
//! keys, ranking card-type labels) goes through [`NetworkType::canonicalize`]
//! exactly once, at the boundary where it enters the model.

use crate::{CardpilotError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Card network used as the join key between wallet instruments and reward
/// table entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkType {
    /// Visa.
    Visa,
    /// Mastercard.
    Mastercard,
    /// Discover.
    Discover,
    /// American Express.
    Amex,
}

impl NetworkType {
    /// All known networks.
    pub const ALL: [NetworkType; 4] = [
        NetworkType::Visa,
        NetworkType::Mastercard,
        NetworkType::Discover,
        NetworkType::Amex,
    ];

    /// Map an issuer or network label onto a network key.
    ///
    /// Matching ignores case, surrounding whitespace and inner spaces, so
    /// "American Express", "AMEX" and "MasterCard" all resolve.
    ///
    /// ```
    /// use cardpilot_lib::NetworkType;
    ///
    /// assert_eq!(NetworkType::canonicalize("American Express"), Some(NetworkType::Amex));
    /// assert_eq!(NetworkType::canonicalize(" visa "), Some(NetworkType::Visa));
    /// assert_eq!(NetworkType::canonicalize("amex_gold"), None);
    /// ```
    pub fn canonicalize(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "visa" => Some(Self::Visa),
            "mastercard" | "mc" => Some(Self::Mastercard),
            "discover" => Some(Self::Discover),
            "amex" | "americanexpress" => Some(Self::Amex),
            _ => None,
        }
    }

    /// Canonical lowercase key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Discover => "discover",
            Self::Amex => "amex",
        }
    }

    /// Suffix used for per-network environment variables.
    pub fn env_suffix(&self) -> &'static str {
        match self {
            Self::Visa => "VISA",
            Self::Mastercard => "MASTERCARD",
            Self::Discover => "DISCOVER",
            Self::Amex => "AMEX",
        }
    }
}

impl FromStr for NetworkType {
    type Err = CardpilotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::canonicalize(s).ok_or_else(|| CardpilotError::UnknownNetwork(s.to_string()))
    }
}

impl TryFrom<String> for NetworkType {
    type Error = CardpilotError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NetworkType> for String {
    fn from(value: NetworkType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_issuer_labels() {
        assert_eq!(NetworkType::canonicalize("Visa"), Some(NetworkType::Visa));
        assert_eq!(
            NetworkType::canonicalize("MasterCard"),
            Some(NetworkType::Mastercard)
        );
        assert_eq!(
            NetworkType::canonicalize("master card"),
            Some(NetworkType::Mastercard)
        );
        assert_eq!(
            NetworkType::canonicalize("DISCOVER"),
            Some(NetworkType::Discover)
        );
        assert_eq!(
            NetworkType::canonicalize("American Express"),
            Some(NetworkType::Amex)
        );
        assert_eq!(NetworkType::canonicalize("amex"), Some(NetworkType::Amex));
    }

    #[test]
    fn test_canonicalize_rejects_unknown() {
        assert_eq!(NetworkType::canonicalize(""), None);
        assert_eq!(NetworkType::canonicalize("unionpay"), None);
        assert_eq!(NetworkType::canonicalize("custom_0"), None);
        assert!("diners".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_round_trips_through_canonical_key() {
        for network in NetworkType::ALL {
            assert_eq!(NetworkType::canonicalize(network.as_str()), Some(network));
        }
    }

    #[test]
    fn test_serde_uses_canonical_key() {
        let json = serde_json::to_string(&NetworkType::Amex).unwrap();
        assert_eq!(json, "\"amex\"");

        let parsed: NetworkType = serde_json::from_str("\"American Express\"").unwrap();
        assert_eq!(parsed, NetworkType::Amex);

        assert!(serde_json::from_str::<NetworkType>("\"jcb\"").is_err());
    }
}
