//! Merchant categories known to the simulator, and descriptor classification.

use serde::Serialize;

/// A merchant category the simulator can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MerchantCategory {
    /// Short key ("restaurant", "airline", ...).
    pub key: &'static str,
    /// Merchant category code.
    pub mcc: &'static str,
    /// Rail category name.
    pub category_name: &'static str,
    /// Descriptor keyword that selects this category.
    pub keyword: &'static str,
}

/// Known categories, in classification order.
pub const CATEGORIES: [MerchantCategory; 6] = [
    MerchantCategory {
        key: "airline",
        mcc: "4511",
        category_name: "airlines_air_carriers",
        keyword: "airlines",
    },
    MerchantCategory {
        key: "restaurant",
        mcc: "5812",
        category_name: "eating_places_restaurants",
        keyword: "bistro",
    },
    MerchantCategory {
        key: "grocery",
        mcc: "5411",
        category_name: "grocery_stores_supermarkets",
        keyword: "whole foods",
    },
    MerchantCategory {
        key: "taxi",
        mcc: "4121",
        category_name: "taxicabs_limousines",
        keyword: "cab",
    },
    MerchantCategory {
        key: "gas",
        mcc: "5541",
        category_name: "service_stations",
        keyword: "gas station",
    },
    MerchantCategory {
        key: "pharmacy",
        mcc: "5912",
        category_name: "drug_stores_and_pharmacies",
        keyword: "pharmacy",
    },
];

/// MCC used when a descriptor matches no keyword.
pub const DEFAULT_MCC: &str = "4121";

/// Classify a merchant descriptor into an MCC.
///
/// The first category whose keyword appears in the descriptor (ignoring case)
/// wins; unmatched descriptors map to [`DEFAULT_MCC`].
///
/// ```
/// use cardpilot_lib::merchant::classify_descriptor;
///
/// assert_eq!(classify_descriptor("Delta Airlines"), "4511");
/// assert_eq!(classify_descriptor("Corner Bistro"), "5812");
/// assert_eq!(classify_descriptor("Hardware Store"), "4121");
/// ```
pub fn classify_descriptor(descriptor: &str) -> &'static str {
    let lowered = descriptor.to_lowercase();
    CATEGORIES
        .iter()
        .find(|c| lowered.contains(c.keyword))
        .map(|c| c.mcc)
        .unwrap_or(DEFAULT_MCC)
}

/// Category by MCC.
pub fn by_mcc(mcc: &str) -> Option<&'static MerchantCategory> {
    let mcc = mcc.trim();
    CATEGORIES.iter().find(|c| c.mcc == mcc)
}

/// Category by key ("restaurant") or rail category name
/// ("eating_places_restaurants").
pub fn by_name(name: &str) -> Option<&'static MerchantCategory> {
    let name = name.trim().to_lowercase();
    CATEGORIES
        .iter()
        .find(|c| c.key == name || c.category_name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_descriptors() {
        assert_eq!(classify_descriptor("United Airlines"), "4511");
        assert_eq!(classify_descriptor("Whole Foods Market"), "5411");
        assert_eq!(classify_descriptor("Yellow Cab Co"), "4121");
        assert_eq!(classify_descriptor("Shell Gas Station"), "5541");
        assert_eq!(classify_descriptor("CVS PHARMACY"), "5912");
    }

    #[test]
    fn test_classify_defaults() {
        assert_eq!(classify_descriptor(""), DEFAULT_MCC);
        assert_eq!(classify_descriptor("Bookstore"), DEFAULT_MCC);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(by_mcc(" 5812 ").unwrap().key, "restaurant");
        assert_eq!(by_name("airline").unwrap().mcc, "4511");
        assert_eq!(by_name("service_stations").unwrap().mcc, "5541");
        assert!(by_mcc("0000").is_none());
    }
}
