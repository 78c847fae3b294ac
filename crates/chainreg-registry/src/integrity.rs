//! # Static Integrity Checks
//!
//! Pure pre-flight report over a [`Registry`] snapshot. No I/O, never fails,
//! and never blocks later stages: a registry with issues is still verified.
//!
//! | Check | Scope |
//! |-------|-------|
//! | Duplicate `key` | every descriptor |
//! | Duplicate `chainId` | every descriptor (soft invariant, report only) |
//! | Duplicate `lzId` | non-zero values only |
//!
//! Each duplicate group is reported once, in order of first appearance.
//! Repairs made while loading the document (healed fields, skipped entries)
//! are reported first.

use crate::registry::Registry;
use indexmap::IndexMap;
use std::fmt;
use std::hash::Hash;

/// A single integrity finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// A descriptor field had the wrong type and was replaced by a safe
    /// default while loading.
    HealedField {
        /// Key of the descriptor.
        key: String,
        /// Wire name of the field, `addresses.<role>` for literals.
        field: String,
        /// What was wrong and what replaced it.
        detail: String,
    },

    /// A chain entry could not be recovered and was left out of the run.
    SkippedEntry {
        /// Position of the entry in the document.
        position: usize,
        /// Why it was skipped.
        reason: String,
    },

    /// Two or more descriptors share a key.
    DuplicateKey {
        /// The repeated key.
        key: String,
        /// How many descriptors carry it.
        count: usize,
    },

    /// Two or more descriptors share a chain id.
    DuplicateChainId {
        /// The repeated chain id.
        chain_id: u64,
        /// Keys of the descriptors involved, in registry order.
        keys: Vec<String>,
    },

    /// Two or more descriptors share a non-zero LayerZero id.
    DuplicateLzId {
        /// The repeated id.
        lz_id: u32,
        /// Keys of the descriptors involved, in registry order.
        keys: Vec<String>,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HealedField { key, field, detail } => {
                write!(f, "chain '{}': healed {} ({})", key, field, detail)
            }
            Self::SkippedEntry { position, reason } => {
                write!(f, "chain entry {} skipped: {}", position, reason)
            }
            Self::DuplicateKey { key, count } => {
                write!(f, "duplicate key '{}' ({} descriptors)", key, count)
            }
            Self::DuplicateChainId { chain_id, keys } => {
                write!(f, "duplicate chainId {}: {}", chain_id, keys.join(", "))
            }
            Self::DuplicateLzId { lz_id, keys } => {
                write!(f, "duplicate lzId {}: {}", lz_id, keys.join(", "))
            }
        }
    }
}

/// Runs every static check.
///
/// Issues are ordered: load repairs, then duplicate keys, then chain ids,
/// then LayerZero ids.
pub fn check_integrity(registry: &Registry) -> Vec<IntegrityIssue> {
    let chains = registry.chains();
    let load_issues = registry.load_issues().iter().cloned();

    let duplicate_keys = group(chains.iter().map(|c| (c.key.clone(), c.key.clone())))
        .into_iter()
        .map(|(key, keys)| IntegrityIssue::DuplicateKey {
            key,
            count: keys.len(),
        });

    let duplicate_chain_ids = group(chains.iter().map(|c| (c.chain_id, c.key.clone())))
        .into_iter()
        .map(|(chain_id, keys)| IntegrityIssue::DuplicateChainId { chain_id, keys });

    let duplicate_lz_ids = group(
        chains
            .iter()
            .filter_map(|c| c.lz_id.filter(|id| *id != 0).map(|id| (id, c.key.clone()))),
    )
    .into_iter()
    .map(|(lz_id, keys)| IntegrityIssue::DuplicateLzId { lz_id, keys });

    load_issues
        .chain(duplicate_keys)
        .chain(duplicate_chain_ids)
        .chain(duplicate_lz_ids)
        .collect()
}

/// Issue descriptions, one line each.
pub fn issue_strings(registry: &Registry) -> Vec<String> {
    check_integrity(registry)
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Groups keys by id, keeping only ids seen more than once.
fn group<K: Hash + Eq>(pairs: impl Iterator<Item = (K, String)>) -> Vec<(K, Vec<String>)> {
    let mut groups: IndexMap<K, Vec<String>> = IndexMap::new();
    for (id, key) in pairs {
        groups.entry(id).or_default().push(key);
    }
    groups
        .into_iter()
        .filter(|(_, keys)| keys.len() > 1)
        .collect()
}
