//! # Role Specification Table
//!
//! Well-known contract roles a chain descriptor may carry, each with an
//! optional default deployment and an optional read-only interface probe.
//!
//! The table is configuration, not state: it is built once, shared behind an
//! `Arc`, and passed into the contract verifier at construction. Adding a role
//! is a data change.
//!
//! ## Ordering
//!
//! Roles are kept tokens first, then protocol contracts, stable within each
//! kind. This is also the order in which the corrected registry writes roles.
//!
//! ## Probe calldata
//!
//! A probe is a function signature plus a count of zero-filled argument words.
//! Calldata is the 4-byte keccak selector followed by `arg_words * 32` zero
//! bytes, which is enough to call cheap view functions such as `decimals()` or
//! `getNonce(address,uint192)`.

use crate::address;
use crate::models::{RegistryError, Result};
use alloy_primitives::{keccak256, Address, Bytes};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Deterministic deployments shared across EVM chains.
const MULTICALL3: Address = alloy_primitives::address!("0xcA11bde05977b3631167028862bE2a173976CA11");
const PERMIT2: Address = alloy_primitives::address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");
const ENTRY_POINT_V07: Address = alloy_primitives::address!("0x0000000071727De22E5E9d8BAf0edAc6f37da032");
const SAFE_SINGLETON_FACTORY: Address = alloy_primitives::address!("0x914d7Fec6aaC8cd542e72Bca78B30650d45643d7");
const CCTP_TOKEN_MESSENGER_V2: Address = alloy_primitives::address!("0x28b5a0e9C621a5BadaA536219b3a228C8168cf5d");
const CCTP_MESSAGE_TRANSMITTER_V2: Address = alloy_primitives::address!("0x81D40F21F12A8F0E3252Bccb954D722d4c464B64");

/// Broad category of a role; decides table ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// ERC-20 style token contracts.
    Token,
    /// Infrastructure and protocol contracts.
    Protocol,
}

/// A read-only call used to confirm a contract's type on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeMethod {
    /// Solidity function signature, e.g. `decimals()`.
    pub signature: String,

    /// Number of zero-filled 32-byte argument words appended to the selector.
    #[serde(default)]
    pub arg_words: usize,
}

impl ProbeMethod {
    /// Creates a probe for a function taking no arguments.
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            arg_words: 0,
        }
    }

    /// Sets the number of zero argument words.
    #[must_use]
    pub fn with_arg_words(mut self, arg_words: usize) -> Self {
        self.arg_words = arg_words;
        self
    }

    /// The 4-byte function selector.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Selector followed by the zero argument words.
    pub fn calldata(&self) -> Bytes {
        let mut data = Vec::with_capacity(4 + self.arg_words * 32);
        data.extend_from_slice(&self.selector());
        data.resize(4 + self.arg_words * 32, 0);
        Bytes::from(data)
    }
}

/// Specification of one contract role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    /// Role name as used in descriptor `addresses`.
    pub name: String,

    /// Token or protocol contract.
    pub kind: RoleKind,

    /// Fallback candidate probed when the configured address is zero or empty.
    pub default_address: Option<Address>,

    /// Interface probe; `None` means bytecode presence is sufficient.
    pub probe: Option<ProbeMethod>,
}

impl RoleSpec {
    /// Creates a role with no default and no probe.
    pub fn new(name: impl Into<String>, kind: RoleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default_address: None,
            probe: None,
        }
    }

    /// Sets the default address.
    #[must_use]
    pub fn with_default(mut self, address: Address) -> Self {
        self.default_address = Some(address);
        self
    }

    /// Sets the interface probe.
    #[must_use]
    pub fn with_probe(mut self, probe: ProbeMethod) -> Self {
        self.probe = Some(probe);
        self
    }
}

/// Serialized form of a [`RoleSpec`], as found in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpecEntry {
    /// Role name.
    pub name: String,

    /// Token or protocol contract.
    pub kind: RoleKind,

    /// Default address literal, any casing.
    #[serde(default)]
    pub default_address: Option<String>,

    /// Interface probe.
    #[serde(default)]
    pub probe: Option<ProbeMethod>,
}

impl TryFrom<RoleSpecEntry> for RoleSpec {
    type Error = RegistryError;

    fn try_from(entry: RoleSpecEntry) -> Result<Self> {
        let default_address = match entry.default_address.as_deref() {
            None => None,
            Some(literal) => {
                let parsed = address::parse(literal).ok_or_else(|| {
                    RegistryError::InvalidRoleTable(format!(
                        "role '{}' has invalid default address '{}'",
                        entry.name, literal
                    ))
                })?;
                if parsed == Address::ZERO {
                    return Err(RegistryError::InvalidRoleTable(format!(
                        "role '{}' uses the zero address as its default",
                        entry.name
                    )));
                }
                Some(parsed)
            }
        };

        Ok(Self {
            name: entry.name,
            kind: entry.kind,
            default_address,
            probe: entry.probe,
        })
    }
}

/// Ordered, validated set of role specifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    roles: Vec<RoleSpec>,
}

impl RoleTable {
    /// Builds a table, validating names and probes and ordering tokens first.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidRoleTable`] on an empty or duplicate
    /// role name, or an empty probe signature.
    pub fn from_specs(mut roles: Vec<RoleSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for role in &roles {
            if role.name.trim().is_empty() {
                return Err(RegistryError::InvalidRoleTable(
                    "role with empty name".to_string(),
                ));
            }
            if !seen.insert(role.name.as_str()) {
                return Err(RegistryError::InvalidRoleTable(format!(
                    "duplicate role '{}'",
                    role.name
                )));
            }
            if let Some(probe) = &role.probe {
                if probe.signature.trim().is_empty() {
                    return Err(RegistryError::InvalidRoleTable(format!(
                        "role '{}' has an empty probe signature",
                        role.name
                    )));
                }
            }
        }

        // Stable: preserves the configured order within each kind.
        roles.sort_by_key(|role| role.kind);
        Ok(Self { roles })
    }

    /// Builds a table from configuration entries.
    pub fn from_entries(entries: Vec<RoleSpecEntry>) -> Result<Self> {
        let specs = entries
            .into_iter()
            .map(RoleSpec::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::from_specs(specs)
    }

    /// Parses a JSON array of [`RoleSpecEntry`].
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<RoleSpecEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// The built-in role table.
    pub fn standard() -> Self {
        let roles = vec![
            RoleSpec::new("gasToken", RoleKind::Token).with_probe(ProbeMethod::new("decimals()")),
            RoleSpec::new("wrappedNative", RoleKind::Token)
                .with_probe(ProbeMethod::new("symbol()")),
            RoleSpec::new("usdc", RoleKind::Token).with_probe(ProbeMethod::new("decimals()")),
            RoleSpec::new("usdt", RoleKind::Token).with_probe(ProbeMethod::new("decimals()")),
            RoleSpec::new("multicall3", RoleKind::Protocol)
                .with_default(MULTICALL3)
                .with_probe(ProbeMethod::new("getBlockNumber()")),
            RoleSpec::new("permit2", RoleKind::Protocol)
                .with_default(PERMIT2)
                .with_probe(ProbeMethod::new("DOMAIN_SEPARATOR()")),
            RoleSpec::new("entryPoint", RoleKind::Protocol)
                .with_default(ENTRY_POINT_V07)
                .with_probe(ProbeMethod::new("getNonce(address,uint192)").with_arg_words(2)),
            RoleSpec::new("safeSingletonFactory", RoleKind::Protocol)
                .with_default(SAFE_SINGLETON_FACTORY),
            RoleSpec::new("tokenMessenger", RoleKind::Protocol)
                .with_default(CCTP_TOKEN_MESSENGER_V2)
                .with_probe(ProbeMethod::new("localMessageTransmitter()")),
            RoleSpec::new("messageTransmitter", RoleKind::Protocol)
                .with_default(CCTP_MESSAGE_TRANSMITTER_V2)
                .with_probe(ProbeMethod::new("localDomain()")),
        ];
        Self { roles }
    }

    /// Roles in table order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleSpec> {
        self.roles.iter()
    }

    /// Looks up a role by name.
    pub fn get(&self, name: &str) -> Option<&RoleSpec> {
        self.roles.iter().find(|role| role.name == name)
    }

    /// Whether the table defines a role.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Role names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|role| role.name.as_str())
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::standard()
    }
}
