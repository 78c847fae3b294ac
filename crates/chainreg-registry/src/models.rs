//! # Core Data Models
//!
//! The chain descriptor record and the error type shared by the registry crate.
//!
//! ## Invariants
//!
//! - `key` is unique across a registry (hard invariant, reported by the
//!   integrity checker when violated in a loaded document).
//! - `chain_id` is expected to be unique, but some networks intentionally reuse
//!   sub-chain ids, so violations are reported and never rejected.
//! - A non-zero `lz_id` is unique among non-zero values; zero or absent means
//!   the chain does not participate in the messaging namespace.
//! - `preferred_rpc_index` / `preferred_explorer_index` should index into their
//!   lists. Out-of-range values are healed to `0` by the reconciler.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One blockchain network.
///
/// Field names are camelCase on the wire. Every field apart from `key` may be
/// omitted and falls back to its empty default.
///
/// # Example
///
/// ```rust
/// use chainreg_registry::ChainDescriptor;
///
/// let chain: ChainDescriptor = serde_json::from_str(r#"{
///     "key": "optimism",
///     "chainId": 10,
///     "lzId": 30111,
///     "rpcEndpoints": ["https://mainnet.optimism.io", "https://op.example"],
///     "preferredRpcIndex": 1,
///     "addresses": { "usdc": "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85" }
/// }"#).unwrap();
///
/// assert_eq!(chain.preferred_rpc(), Some("https://op.example"));
/// assert!(chain.participates_in_lz());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// Stable identifier, unique across the registry.
    pub key: String,

    /// Optional human-readable network name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Numeric network identifier as reported by `eth_chainId`.
    ///
    /// A missing value loads as `0`, which no live network reports, so the
    /// liveness check proposes the live value.
    #[serde(default)]
    pub chain_id: u64,

    /// Cross-chain messaging endpoint id. Zero or absent means not participating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lz_id: Option<u32>,

    /// RPC URLs in preference order.
    #[serde(default)]
    pub rpc_endpoints: Vec<String>,

    /// Index into `rpc_endpoints` selected as default.
    #[serde(default)]
    pub preferred_rpc_index: usize,

    /// Block-explorer URLs in preference order.
    #[serde(default)]
    pub explorer_endpoints: Vec<String>,

    /// Index into `explorer_endpoints` selected as default.
    #[serde(default)]
    pub preferred_explorer_index: usize,

    /// Role name to address literal, in document order.
    ///
    /// Literals are kept exactly as configured (possibly non-checksummed or
    /// malformed) so that the verifier can report what it changed.
    #[serde(default)]
    pub addresses: IndexMap<String, String>,
}

impl ChainDescriptor {
    /// Creates a descriptor with no endpoints and no addresses.
    pub fn new(key: impl Into<String>, chain_id: u64) -> Self {
        Self {
            key: key.into(),
            name: None,
            chain_id,
            lz_id: None,
            rpc_endpoints: Vec::new(),
            preferred_rpc_index: 0,
            explorer_endpoints: Vec::new(),
            preferred_explorer_index: 0,
            addresses: IndexMap::new(),
        }
    }

    /// Appends an RPC endpoint.
    #[must_use]
    pub fn with_rpc(mut self, url: impl Into<String>) -> Self {
        self.rpc_endpoints.push(url.into());
        self
    }

    /// Appends an explorer endpoint.
    #[must_use]
    pub fn with_explorer(mut self, url: impl Into<String>) -> Self {
        self.explorer_endpoints.push(url.into());
        self
    }

    /// Sets the address literal for a role.
    #[must_use]
    pub fn with_address(mut self, role: impl Into<String>, literal: impl Into<String>) -> Self {
        self.addresses.insert(role.into(), literal.into());
        self
    }

    /// Sets the LayerZero endpoint id.
    #[must_use]
    pub fn with_lz_id(mut self, lz_id: u32) -> Self {
        self.lz_id = Some(lz_id);
        self
    }

    /// The preferred RPC URL, or `None` when the index is out of range.
    pub fn preferred_rpc(&self) -> Option<&str> {
        self.rpc_endpoints
            .get(self.preferred_rpc_index)
            .map(String::as_str)
    }

    /// The preferred explorer URL, or `None` when the index is out of range.
    pub fn preferred_explorer(&self) -> Option<&str> {
        self.explorer_endpoints
            .get(self.preferred_explorer_index)
            .map(String::as_str)
    }

    /// Whether the chain has a non-zero LayerZero id.
    pub fn participates_in_lz(&self) -> bool {
        matches!(self.lz_id, Some(id) if id != 0)
    }

    /// The configured literal for a role, if present.
    pub fn address(&self, role: &str) -> Option<&str> {
        self.addresses.get(role).map(String::as_str)
    }
}

/// Errors raised while loading or validating registry inputs.
///
/// All of these are setup failures: they abort a verification run before any
/// chain is probed.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to read or write a registry file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that could not be accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize a registry document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The role specification table is malformed.
    #[error("Invalid role table: {0}")]
    InvalidRoleTable(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let chain: ChainDescriptor =
            serde_json::from_str(r#"{"key": "bare", "chainId": 5}"#).unwrap();

        assert_eq!(chain, ChainDescriptor::new("bare", 5));
        assert_eq!(chain.preferred_rpc(), None);
        assert!(!chain.participates_in_lz());
    }

    #[test]
    fn test_descriptor_wire_names() {
        let chain = ChainDescriptor::new("base", 8453)
            .with_rpc("https://mainnet.base.org")
            .with_lz_id(30184)
            .with_address("usdc", "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(json["chainId"], 8453);
        assert_eq!(json["lzId"], 30184);
        assert_eq!(json["preferredRpcIndex"], 0);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_address_order_preserved() {
        let chain: ChainDescriptor = serde_json::from_str(
            r#"{"key": "k", "chainId": 1, "addresses": {"zeta": "0x0", "alpha": "0x1"}}"#,
        )
        .unwrap();

        let roles: Vec<&String> = chain.addresses.keys().collect();
        assert_eq!(roles, ["zeta", "alpha"]);
    }

    #[test]
    fn test_zero_lz_id_does_not_participate() {
        let chain = ChainDescriptor::new("k", 1).with_lz_id(0);
        assert!(!chain.participates_in_lz());
    }

    #[test]
    fn test_out_of_range_preferred_explorer() {
        let mut chain = ChainDescriptor::new("k", 1).with_explorer("https://scan.example");
        assert_eq!(chain.preferred_explorer(), Some("https://scan.example"));

        chain.preferred_explorer_index = 3;
        assert_eq!(chain.preferred_explorer(), None);
    }
}
