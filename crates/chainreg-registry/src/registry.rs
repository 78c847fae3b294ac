//! # Registry Snapshot
//!
//! The [`Registry`] is loaded once per run and never mutated in place. The
//! reconciler derives a new registry from it; both can then be compared by
//! [`Registry::fingerprint`].
//!
//! ## Document format
//!
//! ```json
//! { "chains": [ { "key": "ethereum", "chainId": 1, "rpcEndpoints": ["..."] } ] }
//! ```
//!
//! Chains are an ordered array rather than a map keyed by `key`, so duplicate
//! keys survive loading and reach the integrity checker. Entries are decoded
//! one at a time: a malformed entry is healed or skipped and never fails the
//! document.

use crate::canonicalize::hash_canonical;
use crate::decode::decode_chain;
use crate::integrity::IntegrityIssue;
use crate::models::{ChainDescriptor, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Immutable set of chain descriptors, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registry {
    /// Chain descriptors in document order.
    pub chains: Vec<ChainDescriptor>,

    #[serde(skip)]
    load_issues: Vec<IntegrityIssue>,
}

#[derive(Deserialize)]
struct Document {
    chains: Vec<Value>,
}

impl Registry {
    /// Creates a registry from descriptors.
    pub fn new(chains: Vec<ChainDescriptor>) -> Self {
        Self {
            chains,
            load_issues: Vec::new(),
        }
    }

    /// Parses a registry document.
    ///
    /// Chain entries are decoded leniently: wrong-typed fields fall back to
    /// safe defaults and entries without a usable key are skipped. Both are
    /// kept as [`load_issues`](Self::load_issues).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Serialization`](crate::RegistryError::Serialization)
    /// when the text is not JSON or has no `chains` array.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(json)?;

        let mut load_issues = Vec::new();
        let chains = document
            .chains
            .into_iter()
            .enumerate()
            .filter_map(|(position, entry)| decode_chain(position, entry, &mut load_issues))
            .collect();

        Ok(Self {
            chains,
            load_issues,
        })
    }

    /// Repairs made while loading, in document order.
    pub fn load_issues(&self) -> &[IntegrityIssue] {
        &self.load_issues
    }

    /// Pretty-printed JSON document.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Descriptors in document order.
    pub fn chains(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    /// First descriptor with the given key.
    pub fn get(&self, key: &str) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|chain| chain.key == key)
    }

    /// All descriptors sharing a chain id.
    pub fn by_chain_id(&self, chain_id: u64) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains
            .iter()
            .filter(move |chain| chain.chain_id == chain_id)
    }

    /// Distinct keys in document order.
    pub fn keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.chains
            .iter()
            .map(|chain| chain.key.as_str())
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the registry has no descriptors.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Hex SHA-256 of the canonical JSON form.
    ///
    /// Two registries with the same content have the same fingerprint
    /// regardless of how their source files were formatted.
    pub fn fingerprint(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(alloy_primitives::hex::encode(hash_canonical(&value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registry {
        Registry::new(vec![
            ChainDescriptor::new("ethereum", 1).with_rpc("https://eth.example"),
            ChainDescriptor::new("optimism", 10),
            ChainDescriptor::new("mainnet", 1),
        ])
    }

    #[test]
    fn test_lookup() {
        let registry = sample();
        assert_eq!(registry.get("optimism").unwrap().chain_id, 10);
        assert!(registry.get("missing").is_none());

        let keys: Vec<&str> = registry.by_chain_id(1).map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["ethereum", "mainnet"]);
    }

    #[test]
    fn test_empty_key_skipped() {
        let registry = Registry::from_json(
            r#"{"chains": [{"key": " ", "chainId": 1}, {"key": "ok", "chainId": 2}]}"#,
        )
        .unwrap();
        assert_eq!(registry.keys(), ["ok"]);
        assert_eq!(
            registry.load_issues(),
            &[IntegrityIssue::SkippedEntry {
                position: 0,
                reason: "empty key".to_string()
            }]
        );
    }

    #[test]
    fn test_malformed_entry_does_not_fail_document() {
        let registry = Registry::from_json(
            r#"{"chains": [{"key":"ok","chainId":1},{"key":"bad","chainId":2,"addresses":{"usdc":null}}]}"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("ok").unwrap(), &ChainDescriptor::new("ok", 1));
        assert_eq!(registry.get("bad").unwrap().address("usdc"), Some("null"));
        assert_eq!(registry.load_issues().len(), 1);
        assert_eq!(
            registry.load_issues()[0].to_string(),
            "chain 'bad': healed addresses.usdc (expected a string, got null)"
        );
    }

    #[test]
    fn test_malformed_document_rejected() {
        let result = Registry::from_json(r#"{"chains": {"ethereum": 1}}"#);
        assert!(matches!(result, Err(crate::RegistryError::Serialization(_))));
        assert!(Registry::from_json("{}").is_err());
    }

    #[test]
    fn test_duplicate_keys_survive_loading() {
        let registry = Registry::from_json(
            r#"{"chains": [{"key": "a", "chainId": 1}, {"key": "a", "chainId": 2}]}"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.keys(), ["a"]);
    }

    #[test]
    fn test_fingerprint_ignores_formatting() {
        let compact = Registry::from_json(r#"{"chains":[{"key":"a","chainId":1}]}"#).unwrap();
        let spaced = Registry::from_json(
            r#"{
                "chains": [ { "chainId": 1, "key": "a" } ]
            }"#,
        )
        .unwrap();

        assert_eq!(compact.fingerprint().unwrap(), spaced.fingerprint().unwrap());
        assert_eq!(compact.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = sample();
        let mut b = sample();
        b.chains[1].preferred_rpc_index = 1;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
