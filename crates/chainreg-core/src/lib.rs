//! # Chain Registry Verifier
//!
//! Verification and reconciliation engine for a chain registry. Probes live
//! RPC endpoints and on-chain bytecode, classifies what it sees, and computes
//! the minimal safe set of corrections without discarding curated data.
//!
//! ## Stages
//!
//! | Stage | Component | Produces |
//! |-------|-----------|----------|
//! | Pre-flight | [`check_integrity`](chainreg_registry::check_integrity) | duplicate key / chainId / lzId report |
//! | Liveness | [`LivenessEvaluator`] | chosen endpoint, `preferredRpcIndex` and `chainId` verdicts |
//! | Contracts | [`ContractVerifier`] | per-role address verdicts |
//! | Reconcile | [`Reconciler`] | corrected registry and change log |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      REGISTRY VERIFIER                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   Registry ──▶ Integrity (report only)                          │
//! │      │                                                          │
//! │      ▼            per chain, up to N chains at once             │
//! │   ┌──────────┐  endpoint  ┌───────────┐                         │
//! │   │ Liveness │───────────▶│ Contracts │                         │
//! │   └────┬─────┘            └─────┬─────┘                         │
//! │        │   CorrectionSet        │  CorrectionSet                │
//! │        └───────────┬────────────┘                               │
//! │                    ▼                                            │
//! │             ┌────────────┐                                      │
//! │             │ Reconciler │──▶ corrected Registry + ChangeLog    │
//! │             └────────────┘                                      │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chainreg_core::{RegistryVerifier, VerifierConfig};
//! use chainreg_registry::storage::RegistryFile;
//!
//! let file = RegistryFile::new("chains.json");
//! let registry = file.load()?;
//! let verifier = RegistryVerifier::connect(&VerifierConfig::default())?;
//!
//! let result = verifier.fix(&registry).await;
//! if result.has_changes() {
//!     file.write(&result.registry)?;
//! }
//! ```
//!
//! ## Guarantees
//!
//! - A configured address with bytecode is never replaced by the zero address
//! - Zero addresses are only upgraded on positive on-chain evidence
//! - A probe failure never aborts a chain, and a chain never aborts a run
//! - Running `fix` on its own output against the same network changes nothing

pub mod config;
pub mod contracts;
pub mod correction;
pub mod error;
pub mod liveness;
pub mod pipeline;
pub mod reconcile;
pub mod verdict;

pub use config::{InterfaceStrictness, ProbeConfig, VerifierConfig};
pub use contracts::{ContractReport, ContractVerifier, RoleCheck};
pub use correction::{CorrectionPlan, CorrectionSet, Fix, PlanEntry};
pub use error::VerifierError;
pub use liveness::{EndpointChoice, EndpointClass, EndpointProbe, LivenessEvaluator, LivenessReport};
pub use pipeline::{ChainReport, RegistryVerifier};
pub use reconcile::{ChangeLog, Reconciler, Reconciliation};
pub use verdict::{CorrectionReason, Verdict};

/// Core result type for verification runs.
pub type Result<T> = std::result::Result<T, VerifierError>;
