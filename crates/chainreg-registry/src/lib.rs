//! # Chain Registry Model
//!
//! In-memory representation of a registry of blockchain network descriptors:
//! RPC endpoints, block-explorer URLs and well-known contract addresses per
//! chain. Everything in this crate is pure: no network access, no clocks.
//!
//! ## Purpose
//!
//! 1. **Registry Model** - [`Registry`] and [`ChainDescriptor`], loaded once per
//!    run and treated as an immutable snapshot. Malformed entries are healed
//!    or skipped one at a time rather than failing the whole document.
//!
//! 2. **Address Normalization** - EIP-55 checksum casing and classification of
//!    configured address literals ([`address`]).
//!
//! 3. **Role Table** - the process-wide description of well-known contract
//!    roles, their default deployments and interface probes ([`RoleTable`]).
//!
//! 4. **Static Integrity Checks** - load repairs plus duplicate key, chain id
//!    and LayerZero id detection ([`check_integrity`]).
//!
//! 5. **File Store** - JSON source/sink for registry documents
//!    ([`storage::RegistryFile`]).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CHAIN REGISTRY                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────┐   classify    ┌────────────────────┐      │
//! │  │   Registry   │──────────────▶│  Address literal   │      │
//! │  │  (snapshot)  │               │  Zero / Canonical  │      │
//! │  └──────┬───────┘               │  NonCanonical /    │      │
//! │         │                       │  Invalid           │      │
//! │         │ duplicates            └────────────────────┘      │
//! │         ▼                                                   │
//! │  ┌──────────────┐               ┌────────────────────┐      │
//! │  │  Integrity   │               │     Role Table     │      │
//! │  │   Checker    │               │ tokens → protocol  │      │
//! │  └──────────────┘               └────────────────────┘      │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chainreg_registry::{check_integrity, Registry};
//!
//! let registry = Registry::from_json(r#"{
//!     "chains": [
//!         { "key": "ethereum", "chainId": 1, "rpcEndpoints": ["https://eth.example"] },
//!         { "key": "mainnet", "chainId": 1 }
//!     ]
//! }"#).unwrap();
//!
//! let issues = check_integrity(&registry);
//! assert_eq!(issues.len(), 1);
//! assert_eq!(issues[0].to_string(), "duplicate chainId 1: ethereum, mainnet");
//! ```
//!
//! ## References
//!
//! - **EIP-55** - "Mixed-case checksum address encoding"
//!   <https://eips.ethereum.org/EIPS/eip-55>
//! - **RFC 8785** - "JSON Canonicalization Scheme (JCS)", used for the
//!   snapshot fingerprint. <https://www.rfc-editor.org/rfc/rfc8785>

pub mod address;
pub mod canonicalize;
mod decode;
pub mod integrity;
pub mod models;
pub mod registry;
pub mod roles;
pub mod storage;

pub use address::{AddressLiteral, ZERO_ADDRESS};
pub use integrity::{check_integrity, IntegrityIssue};
pub use models::{ChainDescriptor, RegistryError, Result};
pub use registry::Registry;
pub use roles::{ProbeMethod, RoleKind, RoleSpec, RoleSpecEntry, RoleTable};

pub use alloy_primitives::{Address, Bytes};
