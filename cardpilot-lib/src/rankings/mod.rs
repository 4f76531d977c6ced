//! Reward ranking catalog.
//!
//! Holds the built-in default ranking, an optional operator-supplied custom
//! ranking and a cache of rankings keyed by wallet signature. Activating a
//! session picks one table from the catalog: cached first, then custom, then
//! the default.
//!
//! The cache can be mirrored to a directory as `cached_rankings_<sig>.json`
//! files in the ranking document format.

use crate::model::{Instrument, RewardTable};
use crate::selection::PreferenceMode;
use crate::{CardpilotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Where an activated reward table came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingSource {
    /// Built-in table.
    Default,
    /// Cached for this wallet signature.
    Cached,
    /// Operator-supplied table.
    Custom,
}

impl fmt::Display for RankingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Cached => "cached",
            Self::Custom => "custom",
        })
    }
}

/// Cache key for a wallet + mode: sorted instrument ids joined by `-`,
/// then `_` and the mode.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WalletSignature(pub String);

impl WalletSignature {
    /// Compute the signature of a set of instruments under a mode.
    pub fn compute(instruments: &[Instrument], mode: PreferenceMode) -> Self {
        let mut ids: Vec<&str> = instruments.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        Self(format!("{}_{}", ids.join("-"), mode))
    }

    /// Get the signature as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn file_name(&self) -> String {
        let safe: String = self
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("cached_rankings_{}.json", safe)
    }
}

impl fmt::Display for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Load a ranking document from disk.
pub fn load_rankings_file(path: impl AsRef<Path>) -> Result<RewardTable> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => {
            CardpilotError::not_found("ranking file", path.display().to_string())
        }
        _ => CardpilotError::from(err),
    })?;
    let (table, _dropped) = RewardTable::from_rankings_json(&json)?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        path = %path.display(),
        categories = table.len(),
        dropped = _dropped,
        "loaded ranking file"
    );

    Ok(table)
}

/// Default, custom and cached reward tables.
#[derive(Debug)]
pub struct RankingCatalog {
    default: Arc<RewardTable>,
    custom: RwLock<Option<Arc<RewardTable>>>,
    cache: RwLock<HashMap<WalletSignature, Arc<RewardTable>>>,
    cache_dir: Option<PathBuf>,
}

impl RankingCatalog {
    /// Create a catalog around the built-in table.
    pub fn new(default: RewardTable) -> Self {
        Self {
            default: Arc::new(default),
            custom: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
            cache_dir: None,
        }
    }

    /// Mirror the cache to `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// The built-in table.
    pub fn default_table(&self) -> Arc<RewardTable> {
        Arc::clone(&self.default)
    }

    /// Install an operator-supplied table.
    pub fn set_custom(&self, table: RewardTable) -> Result<()> {
        let mut custom = self
            .custom
            .write()
            .map_err(|e| CardpilotError::Internal(format!("Lock poisoned: {}", e)))?;
        *custom = Some(Arc::new(table));
        Ok(())
    }

    /// Remove the operator-supplied table.
    pub fn clear_custom(&self) -> Result<()> {
        let mut custom = self
            .custom
            .write()
            .map_err(|e| CardpilotError::Internal(format!("Lock poisoned: {}", e)))?;
        *custom = None;
        Ok(())
    }

    /// Cache a table for a wallet signature.
    pub fn store(&self, signature: &WalletSignature, table: Arc<RewardTable>) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            std::fs::create_dir_all(dir)?;
            std::fs::write(dir.join(signature.file_name()), table.to_rankings_json()?)?;
        }

        let mut cache = self
            .cache
            .write()
            .map_err(|e| CardpilotError::Internal(format!("Lock poisoned: {}", e)))?;
        cache.insert(signature.clone(), table);
        Ok(())
    }

    /// Look up a cached table, consulting the cache directory on a miss.
    pub fn cached(&self, signature: &WalletSignature) -> Result<Option<Arc<RewardTable>>> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|e| CardpilotError::Internal(format!("Lock poisoned: {}", e)))?;
            if let Some(table) = cache.get(signature) {
                return Ok(Some(Arc::clone(table)));
            }
        }

        let Some(dir) = &self.cache_dir else {
            return Ok(None);
        };
        let path = dir.join(signature.file_name());
        if !path.exists() {
            return Ok(None);
        }

        let table = Arc::new(load_rankings_file(&path)?);
        let mut cache = self
            .cache
            .write()
            .map_err(|e| CardpilotError::Internal(format!("Lock poisoned: {}", e)))?;
        cache.insert(signature.clone(), Arc::clone(&table));
        Ok(Some(table))
    }

    /// Pick the table for a new session.
    ///
    /// Order: cached for this signature, then custom, then default. The
    /// chosen custom or default table is cached under the signature so the
    /// next session with the same wallet reuses it.
    pub fn activate(&self, signature: &WalletSignature) -> Result<(Arc<RewardTable>, RankingSource)> {
        if let Some(table) = self.cached(signature)? {
            return Ok((table, RankingSource::Cached));
        }

        let custom = self
            .custom
            .read()
            .map_err(|e| CardpilotError::Internal(format!("Lock poisoned: {}", e)))?
            .clone();

        let (table, source) = match custom {
            Some(table) => (table, RankingSource::Custom),
            None => (self.default_table(), RankingSource::Default),
        };
        self.store(signature, Arc::clone(&table))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(signature = %signature, source = %source, "activated ranking table");

        Ok((table, source))
    }

    /// Number of cached tables held in memory.
    pub fn cache_len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Drop all in-memory cache entries. Returns how many were removed.
    pub fn clear_cache(&self) -> Result<usize> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| CardpilotError::Internal(format!("Lock poisoned: {}", e)))?;
        let removed = cache.len();
        cache.clear();
        Ok(removed)
    }
}

impl Default for RankingCatalog {
    fn default() -> Self {
        Self::new(RewardTable::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NetworkType, RewardEntry};

    fn table(amount: f64) -> RewardTable {
        RewardTable::new().with_category(
            "5812",
            vec![RewardEntry::new(NetworkType::Visa, amount, "Points").unwrap()],
        )
    }

    fn instruments() -> Vec<Instrument> {
        vec![
            Instrument::new("16", "Discover it", NetworkType::Discover),
            Instrument::new("2", "Sapphire", NetworkType::Visa),
            Instrument::new("4", "Gold", NetworkType::Amex),
        ]
    }

    #[test]
    fn test_signature_sorts_ids() {
        let sig = WalletSignature::compute(&instruments(), PreferenceMode::Rewards);
        assert_eq!(sig.as_str(), "16-2-4_rewards");

        let mut reversed = instruments();
        reversed.reverse();
        assert_eq!(
            WalletSignature::compute(&reversed, PreferenceMode::Rewards),
            sig
        );
        assert_ne!(
            WalletSignature::compute(&reversed, PreferenceMode::Cash),
            sig
        );
    }

    #[test]
    fn test_activate_default_then_cached() {
        let catalog = RankingCatalog::new(table(3.0));
        let sig = WalletSignature::compute(&instruments(), PreferenceMode::Cash);

        let (_, source) = catalog.activate(&sig).unwrap();
        assert_eq!(source, RankingSource::Default);

        let (cached, source) = catalog.activate(&sig).unwrap();
        assert_eq!(source, RankingSource::Cached);
        assert_eq!(*cached, table(3.0));
        assert_eq!(catalog.cache_len(), 1);
    }

    #[test]
    fn test_custom_beats_default_but_not_cache() {
        let catalog = RankingCatalog::new(table(3.0));
        let cached_sig = WalletSignature("1_rewards".into());
        catalog.store(&cached_sig, Arc::new(table(9.0))).unwrap();
        catalog.set_custom(table(5.0)).unwrap();

        let (custom, source) = catalog
            .activate(&WalletSignature("2_rewards".into()))
            .unwrap();
        assert_eq!(source, RankingSource::Custom);
        assert_eq!(*custom, table(5.0));

        let (cached, source) = catalog.activate(&cached_sig).unwrap();
        assert_eq!(source, RankingSource::Cached);
        assert_eq!(*cached, table(9.0));
    }

    #[test]
    fn test_clear_cache() {
        let catalog = RankingCatalog::default();
        catalog
            .activate(&WalletSignature("1_cash".into()))
            .unwrap();
        assert_eq!(catalog.clear_cache().unwrap(), 1);
        assert_eq!(catalog.cache_len(), 0);
    }

    #[test]
    fn test_cache_dir_survives_new_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let sig = WalletSignature::compute(&instruments(), PreferenceMode::Rewards);

        let first = RankingCatalog::new(table(4.0)).with_cache_dir(dir.path());
        first.activate(&sig).unwrap();
        assert!(dir.path().join("cached_rankings_16-2-4_rewards.json").exists());

        let second = RankingCatalog::new(table(1.0)).with_cache_dir(dir.path());
        let (loaded, source) = second.activate(&sig).unwrap();
        assert_eq!(source, RankingSource::Cached);
        assert_eq!(loaded.get("5812").unwrap()[0].reward_amount, 4.0);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rankings_file(dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code(), crate::CardpilotErrorCode::NotFound);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rankings.json");
        std::fs::write(
            &path,
            r#"{"5411": [{"cardName": "Blue Cash", "cardType": "American Express", "rewardAmount": 6, "rewardType": "Cash Back"}]}"#,
        )
        .unwrap();

        let table = load_rankings_file(&path).unwrap();
        let entries = table.get("5411").unwrap();
        assert_eq!(entries[0].network, NetworkType::Amex);
        assert!(entries[0].reward_kind.is_cash());
    }
}
