//! # Correction Sets
//!
//! Field-level overrides proposed for one chain, and the per-run plan that
//! collects them.
//!
//! ## Merge
//!
//! Each stage (schema healing, liveness, contracts, backfill) produces its
//! own [`CorrectionSet`]; they are combined once per chain with
//! [`CorrectionSet::merge`]. Scalar fields take the later value when both are
//! set. The role map is merged per role, later wins, keeping the position at
//! which a role first appeared. The merge is associative and the empty set is
//! its identity:
//!
//! ```rust
//! use chainreg_core::{CorrectionReason, CorrectionSet};
//!
//! let schema = CorrectionSet::new().with_preferred_rpc_index(0, CorrectionReason::IndexOutOfRange);
//! let liveness = CorrectionSet::new().with_preferred_rpc_index(1, CorrectionReason::PreferredEndpoint);
//!
//! let merged = schema.merge(liveness);
//! assert_eq!(merged.preferred_rpc_index.as_ref().unwrap().value, 1);
//! assert_eq!(merged.clone().merge(CorrectionSet::new()), merged);
//! ```

use crate::verdict::CorrectionReason;
use chainreg_registry::ChainDescriptor;
use indexmap::IndexMap;
use serde::Serialize;

/// A proposed value and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix<T> {
    /// New value.
    pub value: T,
    /// Why.
    pub reason: CorrectionReason,
}

impl<T> Fix<T> {
    /// Creates a fix.
    pub fn new(value: T, reason: CorrectionReason) -> Self {
        Self { value, reason }
    }
}

/// Overrides proposed for one chain descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionSet {
    /// New `preferredRpcIndex`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_rpc_index: Option<Fix<usize>>,

    /// New `preferredExplorerIndex`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_explorer_index: Option<Fix<usize>>,

    /// New `chainId`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<Fix<u64>>,

    /// New address literals per role.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub addresses: IndexMap<String, Fix<String>>,
}

impl CorrectionSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preferred RPC index override.
    #[must_use]
    pub fn with_preferred_rpc_index(mut self, index: usize, reason: CorrectionReason) -> Self {
        self.preferred_rpc_index = Some(Fix::new(index, reason));
        self
    }

    /// Sets the preferred explorer index override.
    #[must_use]
    pub fn with_preferred_explorer_index(mut self, index: usize, reason: CorrectionReason) -> Self {
        self.preferred_explorer_index = Some(Fix::new(index, reason));
        self
    }

    /// Sets the chain id override.
    #[must_use]
    pub fn with_chain_id(mut self, chain_id: u64, reason: CorrectionReason) -> Self {
        self.chain_id = Some(Fix::new(chain_id, reason));
        self
    }

    /// Sets an address override.
    #[must_use]
    pub fn with_address(
        mut self,
        role: impl Into<String>,
        literal: impl Into<String>,
        reason: CorrectionReason,
    ) -> Self {
        self.set_address(role, literal, reason);
        self
    }

    /// Sets an address override in place.
    pub fn set_address(
        &mut self,
        role: impl Into<String>,
        literal: impl Into<String>,
        reason: CorrectionReason,
    ) {
        self.addresses
            .insert(role.into(), Fix::new(literal.into(), reason));
    }

    /// Whether nothing is proposed.
    pub fn is_empty(&self) -> bool {
        self.preferred_rpc_index.is_none()
            && self.preferred_explorer_index.is_none()
            && self.chain_id.is_none()
            && self.addresses.is_empty()
    }

    /// Number of overridden fields.
    pub fn len(&self) -> usize {
        usize::from(self.preferred_rpc_index.is_some())
            + usize::from(self.preferred_explorer_index.is_some())
            + usize::from(self.chain_id.is_some())
            + self.addresses.len()
    }

    /// Combines two sets; `later` wins on every field both set.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        self.preferred_rpc_index = later.preferred_rpc_index.or(self.preferred_rpc_index);
        self.preferred_explorer_index = later
            .preferred_explorer_index
            .or(self.preferred_explorer_index);
        self.chain_id = later.chain_id.or(self.chain_id);
        self.addresses.extend(later.addresses);
        self
    }

    /// Drops overrides that would leave `chain` unchanged.
    pub fn retain_changes(&mut self, chain: &ChainDescriptor) {
        if matches!(&self.preferred_rpc_index, Some(fix) if fix.value == chain.preferred_rpc_index) {
            self.preferred_rpc_index = None;
        }
        if matches!(&self.preferred_explorer_index, Some(fix) if fix.value == chain.preferred_explorer_index)
        {
            self.preferred_explorer_index = None;
        }
        if matches!(&self.chain_id, Some(fix) if fix.value == chain.chain_id) {
            self.chain_id = None;
        }
        self.addresses
            .retain(|role, fix| chain.address(role) != Some(fix.value.as_str()));
    }
}

/// One descriptor's corrections within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    /// Position of the descriptor in the registry.
    pub position: usize,
    /// Chain key, for reporting.
    pub key: String,
    /// The corrections.
    #[serde(flatten)]
    pub set: CorrectionSet,
}

/// Corrections for a whole run, one entry per descriptor, in registry order.
///
/// Entries are addressed by descriptor position rather than by key, so two
/// descriptors that share a key never receive each other's corrections.
/// Empty sets are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CorrectionPlan {
    entries: Vec<PlanEntry>,
}

impl CorrectionPlan {
    /// The empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the corrections for the descriptor at `position`, merging with
    /// any already recorded for that position.
    pub fn insert(&mut self, position: usize, key: impl Into<String>, set: CorrectionSet) {
        if set.is_empty() {
            return;
        }
        match self.entries.binary_search_by_key(&position, |entry| entry.position) {
            Ok(found) => {
                let entry = &mut self.entries[found];
                entry.set = std::mem::take(&mut entry.set).merge(set);
            }
            Err(slot) => self.entries.insert(
                slot,
                PlanEntry {
                    position,
                    key: key.into(),
                    set,
                },
            ),
        }
    }

    /// Corrections for the descriptor at `position`.
    pub fn at(&self, position: usize) -> Option<&CorrectionSet> {
        self.entries
            .binary_search_by_key(&position, |entry| entry.position)
            .ok()
            .map(|found| &self.entries[found].set)
    }

    /// Corrections for the first descriptor with `key`.
    pub fn get(&self, key: &str) -> Option<&CorrectionSet> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.set)
    }

    /// Descriptors with corrections, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter()
    }

    /// Number of descriptors with corrections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no descriptor has corrections.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON form for programmatic consumers.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERMIT2: &str = "0x000000000022D473030F116dDEE9F6B43aC78BA3";
    const ZERO: &str = "0x0000000000000000000000000000000000000000";

    fn liveness() -> CorrectionSet {
        CorrectionSet::new()
            .with_preferred_rpc_index(1, CorrectionReason::PreferredEndpoint)
            .with_chain_id(10, CorrectionReason::ChainIdMismatch)
    }

    fn contracts() -> CorrectionSet {
        CorrectionSet::new()
            .with_address("permit2", PERMIT2, CorrectionReason::FoundBytecodeAtDefault)
            .with_address("usdc", ZERO, CorrectionReason::NoBytecode)
    }

    fn schema() -> CorrectionSet {
        CorrectionSet::new()
            .with_preferred_rpc_index(0, CorrectionReason::IndexOutOfRange)
            .with_preferred_explorer_index(0, CorrectionReason::IndexOutOfRange)
            .with_address("usdc", ZERO, CorrectionReason::InvalidAddress)
    }

    #[test]
    fn test_empty() {
        let set = CorrectionSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_merge_later_wins() {
        let merged = schema().merge(liveness()).merge(contracts());
        assert_eq!(merged.preferred_rpc_index, Some(Fix::new(1, CorrectionReason::PreferredEndpoint)));
        assert_eq!(merged.preferred_explorer_index.as_ref().unwrap().value, 0);
        assert_eq!(merged.chain_id.as_ref().unwrap().value, 10);
        assert_eq!(merged.addresses["usdc"].reason, CorrectionReason::NoBytecode);
        assert_eq!(merged.len(), 5);
    }

    #[test]
    fn test_merge_is_associative() {
        let left = schema().merge(liveness()).merge(contracts());
        let right = schema().merge(liveness().merge(contracts()));
        assert_eq!(left, right);

        let roles: Vec<&str> = left.addresses.keys().map(String::as_str).collect();
        assert_eq!(roles, vec!["usdc", "permit2"]);
    }

    #[test]
    fn test_merge_identity() {
        assert_eq!(CorrectionSet::new().merge(contracts()), contracts());
        assert_eq!(contracts().merge(CorrectionSet::new()), contracts());
    }

    #[test]
    fn test_retain_changes_drops_no_ops() {
        let chain = ChainDescriptor::new("foo", 10)
            .with_rpc("https://a")
            .with_address("usdc", ZERO);

        let mut set = liveness().merge(contracts());
        set.retain_changes(&chain);

        assert!(set.chain_id.is_none());
        assert!(!set.addresses.contains_key("usdc"));
        assert!(set.preferred_rpc_index.is_some());
        assert!(set.addresses.contains_key("permit2"));
    }

    #[test]
    fn test_plan_skips_empty_sets() {
        let mut plan = CorrectionPlan::new();
        plan.insert(0, "foo", CorrectionSet::new());
        assert!(plan.is_empty());

        plan.insert(1, "bar", contracts());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.get("bar"), Some(&contracts()));
        assert_eq!(plan.at(1), Some(&contracts()));
        assert_eq!(plan.at(0), None);
    }

    #[test]
    fn test_plan_merges_same_position() {
        let mut plan = CorrectionPlan::new();
        plan.insert(0, "foo", liveness());
        plan.insert(1, "bar", schema());
        plan.insert(0, "foo", contracts());

        let keys: Vec<&str> = plan.iter().map(|entry| entry.key.as_str()).collect();
        assert_eq!(keys, vec!["foo", "bar"]);
        assert_eq!(plan.at(0).unwrap().len(), 4);
    }

    #[test]
    fn test_plan_keeps_duplicate_keys_apart() {
        let mut plan = CorrectionPlan::new();
        plan.insert(2, "x", liveness());
        plan.insert(0, "x", schema());

        let positions: Vec<usize> = plan.iter().map(|entry| entry.position).collect();
        assert_eq!(positions, vec![0, 2]);
        assert_eq!(plan.at(0), Some(&schema()));
        assert_eq!(plan.at(2), Some(&liveness()));
        assert_eq!(plan.get("x"), Some(&schema()));
    }

    #[test]
    fn test_plan_json() {
        let mut plan = CorrectionPlan::new();
        plan.insert(0, "foo", liveness());
        let json: serde_json::Value = serde_json::from_str(&plan.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json[0]["key"], "foo");
        assert_eq!(json[0]["position"], 0);
        assert_eq!(json[0]["preferredRpcIndex"]["value"], 1);
        assert_eq!(json[0]["chainId"]["reason"], "chainIdMismatch");
        assert!(json[0].get("addresses").is_none());
    }
}
