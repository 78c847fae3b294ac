//! # Reconciler
//!
//! Combines the per-stage correction sets of each chain and derives the
//! corrected registry from the loaded snapshot.
//!
//! ## Per-chain merge order
//!
//! ```text
//! schema healing ─▶ liveness ─▶ contracts ─▶ missing-role backfill
//! ```
//!
//! Later stages win per field. Schema healing runs for every chain, so
//! out-of-range indexes and malformed literals are healed even when a chain
//! has no reachable endpoint.
//!
//! ## Output
//!
//! The snapshot is never mutated. Every chain in the corrected registry
//! carries every table role, written in table order, followed by extra roles
//! in their original order.

use crate::contracts::{literal_fix, ContractReport};
use crate::correction::{CorrectionPlan, CorrectionSet};
use crate::liveness::LivenessReport;
use crate::verdict::CorrectionReason;
use chainreg_registry::address;
use chainreg_registry::{ChainDescriptor, Registry, RoleTable, ZERO_ADDRESS};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Human-readable changes per chain, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeLog {
    chains: IndexMap<String, Vec<String>>,
}

impl ChangeLog {
    /// The empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, key: &str, line: String) {
        self.chains.entry(key.to_string()).or_default().push(line);
    }

    /// Whether nothing changed. No output is written for an empty log.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Total number of changes.
    pub fn len(&self) -> usize {
        self.chains.values().map(Vec::len).sum()
    }

    /// Changes for one chain.
    pub fn lines(&self, key: &str) -> &[String] {
        self.chains.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Chains with changes, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.chains
            .iter()
            .map(|(key, lines)| (key.as_str(), lines.as_slice()))
    }
}

impl fmt::Display for ChangeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, lines) in self.iter() {
            writeln!(f, "{}:", key)?;
            for line in lines {
                writeln!(f, "  {}", line)?;
            }
        }
        Ok(())
    }
}

/// A corrected registry and what changed to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The corrected registry.
    pub registry: Registry,
    /// Corrections per chain.
    pub plan: CorrectionPlan,
    /// Human-readable change log.
    pub log: ChangeLog,
}

impl Reconciliation {
    /// Whether the corrected registry differs from the snapshot.
    pub fn has_changes(&self) -> bool {
        !self.log.is_empty()
    }
}

/// Merges correction sets and applies them.
#[derive(Debug, Clone)]
pub struct Reconciler {
    roles: Arc<RoleTable>,
}

impl Reconciler {
    /// Creates a reconciler for a role table.
    pub fn new(roles: Arc<RoleTable>) -> Self {
        Self { roles }
    }

    /// The role table.
    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    /// Heals fields that are wrong regardless of network state.
    pub fn schema_corrections(&self, chain: &ChainDescriptor) -> CorrectionSet {
        let mut set = CorrectionSet::new();
        if chain.preferred_rpc_index != 0 && chain.preferred_rpc_index >= chain.rpc_endpoints.len() {
            set = set.with_preferred_rpc_index(0, CorrectionReason::IndexOutOfRange);
        }
        if chain.preferred_explorer_index != 0
            && chain.preferred_explorer_index >= chain.explorer_endpoints.len()
        {
            set = set.with_preferred_explorer_index(0, CorrectionReason::IndexOutOfRange);
        }
        for (role, literal) in &chain.addresses {
            if let Some(fix) = literal_fix(&address::classify(literal)) {
                set.addresses.insert(role.clone(), fix);
            }
        }
        set
    }

    /// Zero entries for table roles that neither the descriptor nor `merged`
    /// provides.
    pub fn backfill(&self, chain: &ChainDescriptor, merged: &CorrectionSet) -> CorrectionSet {
        let mut set = CorrectionSet::new();
        for name in self.roles.names() {
            if !chain.addresses.contains_key(name) && !merged.addresses.contains_key(name) {
                set.set_address(name, ZERO_ADDRESS, CorrectionReason::MissingRole);
            }
        }
        set
    }

    /// The merged, no-op-free correction set for one chain.
    ///
    /// `contracts` is `None` when contract verification was skipped.
    pub fn reconcile_chain(
        &self,
        chain: &ChainDescriptor,
        liveness: Option<&LivenessReport>,
        contracts: Option<&ContractReport>,
    ) -> CorrectionSet {
        let merged = self
            .schema_corrections(chain)
            .merge(liveness.map(LivenessReport::corrections).unwrap_or_default())
            .merge(contracts.map(ContractReport::corrections).unwrap_or_default());
        let backfill = self.backfill(chain, &merged);

        let mut merged = merged.merge(backfill);
        merged.retain_changes(chain);
        merged
    }

    /// Derives the corrected registry; `registry` itself is left untouched.
    pub fn apply(&self, registry: &Registry, plan: CorrectionPlan) -> Reconciliation {
        let mut log = ChangeLog::new();
        let chains = registry
            .chains()
            .iter()
            .enumerate()
            .map(|(position, chain)| {
                let set = plan.at(position);
                let corrected = self.apply_chain(chain, set);
                if let Some(set) = set {
                    for line in describe(chain, &corrected, set) {
                        info!(chain = %chain.key, change = %line, "Correction");
                        log.push(&chain.key, line);
                    }
                }
                corrected
            })
            .collect();

        Reconciliation {
            registry: Registry::new(chains),
            plan,
            log,
        }
    }

    fn apply_chain(&self, chain: &ChainDescriptor, set: Option<&CorrectionSet>) -> ChainDescriptor {
        let mut corrected = chain.clone();
        let fixed = |role: &str| set.and_then(|s| s.addresses.get(role)).map(|fix| fix.value.clone());

        if let Some(set) = set {
            if let Some(fix) = &set.preferred_rpc_index {
                corrected.preferred_rpc_index = fix.value;
            }
            if let Some(fix) = &set.preferred_explorer_index {
                corrected.preferred_explorer_index = fix.value;
            }
            if let Some(fix) = &set.chain_id {
                corrected.chain_id = fix.value;
            }
        }

        let mut addresses = IndexMap::with_capacity(self.roles.len() + chain.addresses.len());
        for name in self.roles.names() {
            if let Some(literal) = fixed(name).or_else(|| chain.addresses.get(name).cloned()) {
                addresses.insert(name.to_string(), literal);
            }
        }
        for (name, literal) in &chain.addresses {
            if !self.roles.contains(name) {
                addresses.insert(name.clone(), fixed(name.as_str()).unwrap_or_else(|| literal.clone()));
            }
        }
        if let Some(set) = set {
            for (name, fix) in &set.addresses {
                if !addresses.contains_key(name) {
                    addresses.insert(name.clone(), fix.value.clone());
                }
            }
        }
        corrected.addresses = addresses;
        corrected
    }
}

/// Change log lines, `<field>: <old> -> <new> (<reason>)`.
fn describe(original: &ChainDescriptor, corrected: &ChainDescriptor, set: &CorrectionSet) -> Vec<String> {
    let mut lines = Vec::with_capacity(set.len());
    if let Some(fix) = &set.preferred_rpc_index {
        lines.push(format!(
            "preferredRpcIndex: {} -> {} ({})",
            original.preferred_rpc_index, fix.value, fix.reason
        ));
    }
    if let Some(fix) = &set.preferred_explorer_index {
        lines.push(format!(
            "preferredExplorerIndex: {} -> {} ({})",
            original.preferred_explorer_index, fix.value, fix.reason
        ));
    }
    if let Some(fix) = &set.chain_id {
        lines.push(format!(
            "chainId: {} -> {} ({})",
            original.chain_id, fix.value, fix.reason
        ));
    }
    for role in corrected.addresses.keys() {
        if let Some(fix) = set.addresses.get(role) {
            lines.push(format!(
                "addresses.{}: {} -> {} ({})",
                role,
                original.address(role).unwrap_or("(missing)"),
                fix.value,
                fix.reason
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainreg_registry::{RoleKind, RoleSpec};

    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn reconciler() -> Reconciler {
        Reconciler::new(Arc::new(RoleTable::standard()))
    }

    #[test]
    fn test_schema_heals_indexes_and_literals() {
        let mut chain = ChainDescriptor::new("foo", 1)
            .with_rpc("https://a")
            .with_address("usdc", USDC.to_lowercase())
            .with_address("permit2", "0x0");
        chain.preferred_rpc_index = 4;
        chain.preferred_explorer_index = 1;

        let set = reconciler().schema_corrections(&chain);
        assert_eq!(set.preferred_rpc_index.as_ref().unwrap().value, 0);
        assert_eq!(set.preferred_explorer_index.as_ref().unwrap().value, 0);
        assert_eq!(set.addresses["usdc"].value, USDC);
        assert_eq!(set.addresses["usdc"].reason, CorrectionReason::ChecksumMismatch);
        assert_eq!(set.addresses["permit2"].value, ZERO_ADDRESS);
        assert_eq!(set.addresses["permit2"].reason, CorrectionReason::InvalidAddress);
    }

    #[test]
    fn test_schema_leaves_empty_lists_alone() {
        let chain = ChainDescriptor::new("bare", 1);
        assert!(reconciler().schema_corrections(&chain).is_empty());
    }

    #[test]
    fn test_backfill_completeness() {
        let reconciler = reconciler();
        let chain = ChainDescriptor::new("foo", 1).with_address("usdc", USDC);
        let set = reconciler.reconcile_chain(&chain, None, None);

        let registry = Registry::new(vec![chain]);
        let mut plan = CorrectionPlan::new();
        plan.insert(0, "foo", set);
        let result = reconciler.apply(&registry, plan);

        let corrected = result.registry.get("foo").unwrap();
        for role in RoleTable::standard().names() {
            assert!(corrected.addresses.contains_key(role), "missing {}", role);
        }
        assert_eq!(corrected.address("usdc"), Some(USDC));
        assert_eq!(result.log.len(), RoleTable::standard().len() - 1);
        assert!(result.log.lines("foo").iter().all(|l| l.ends_with("(added missing role)")));
    }

    #[test]
    fn test_backfill_skips_roles_already_corrected() {
        let chain = ChainDescriptor::new("foo", 1);
        let merged = CorrectionSet::new().with_address(
            "permit2",
            "0x000000000022D473030F116dDEE9F6B43aC78BA3",
            CorrectionReason::FoundBytecodeAtDefault,
        );
        let backfill = reconciler().backfill(&chain, &merged);
        assert!(!backfill.addresses.contains_key("permit2"));
        assert!(backfill.addresses.contains_key("usdc"));
    }

    #[test]
    fn test_apply_orders_roles_table_first_then_extras() {
        let table = RoleTable::from_specs(vec![
            RoleSpec::new("permit2", RoleKind::Protocol),
            RoleSpec::new("usdc", RoleKind::Token),
        ])
        .unwrap();
        let reconciler = Reconciler::new(Arc::new(table));
        let chain = ChainDescriptor::new("foo", 1)
            .with_address("pyusd", ZERO_ADDRESS)
            .with_address("permit2", ZERO_ADDRESS)
            .with_address("usdc", ZERO_ADDRESS);
        let registry = Registry::new(vec![chain]);

        let result = reconciler.apply(&registry, CorrectionPlan::new());
        let order: Vec<&str> = result.registry.chains()[0]
            .addresses
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(order, vec!["usdc", "permit2", "pyusd"]);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_change_log_format() {
        let chain = ChainDescriptor::new("foo", 10)
            .with_rpc("https://a")
            .with_rpc("https://b");
        let registry = Registry::new(vec![chain]);
        let mut plan = CorrectionPlan::new();
        plan.insert(
            0,
            "foo",
            CorrectionSet::new()
                .with_preferred_rpc_index(1, CorrectionReason::PreferredEndpoint)
                .with_address("permit2", "0x000000000022D473030F116dDEE9F6B43aC78BA3", CorrectionReason::FoundBytecodeAtDefault),
        );

        let result = Reconciler::new(Arc::new(RoleTable::standard())).apply(&registry, plan);
        assert_eq!(
            result.log.lines("foo"),
            &[
                "preferredRpcIndex: 0 -> 1 (first endpoint reporting the configured chainId)".to_string(),
                "addresses.permit2: (missing) -> 0x000000000022D473030F116dDEE9F6B43aC78BA3 (found bytecode at default)".to_string(),
            ]
        );
        assert_eq!(registry.chains()[0].preferred_rpc_index, 0);
        assert_eq!(result.registry.chains()[0].preferred_rpc_index, 1);
        assert!(result.log.to_string().starts_with("foo:\n  preferredRpcIndex"));
    }

    #[test]
    fn test_reconcile_is_idempotent_on_corrected_registry() {
        let reconciler = reconciler();
        let mut chain = ChainDescriptor::new("foo", 1)
            .with_rpc("https://a")
            .with_address("usdc", USDC.to_lowercase());
        chain.preferred_rpc_index = 3;
        let registry = Registry::new(vec![chain.clone()]);

        let mut plan = CorrectionPlan::new();
        plan.insert(0, "foo", reconciler.reconcile_chain(&chain, None, None));
        let first = reconciler.apply(&registry, plan);
        assert!(first.has_changes());

        let corrected = first.registry.chains()[0].clone();
        let mut plan = CorrectionPlan::new();
        plan.insert(0, "foo", reconciler.reconcile_chain(&corrected, None, None));
        let second = reconciler.apply(&first.registry, plan);
        assert!(!second.has_changes());
        assert_eq!(second.registry, first.registry);
    }

    #[test]
    fn test_apply_by_position_with_duplicate_keys() {
        let first = ChainDescriptor::new("x", 1).with_rpc("https://a");
        let second = ChainDescriptor::new("x", 2)
            .with_rpc("https://b0")
            .with_rpc("https://b1");
        let registry = Registry::new(vec![first, second]);

        let mut plan = CorrectionPlan::new();
        plan.insert(
            1,
            "x",
            CorrectionSet::new().with_preferred_rpc_index(1, CorrectionReason::PreferredEndpoint),
        );
        let result = Reconciler::new(Arc::new(RoleTable::from_specs(Vec::new()).unwrap()))
            .apply(&registry, plan);

        assert_eq!(result.registry.chains()[0].preferred_rpc_index, 0);
        assert_eq!(result.registry.chains()[1].preferred_rpc_index, 1);
        assert_eq!(result.log.len(), 1);
    }
}
