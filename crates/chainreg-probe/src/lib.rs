//! # Endpoint Prober
//!
//! Point-in-time probes against live networks, classified into outcome enums
//! instead of errors:
//!
//! - **RPC liveness**: `eth_chainId` against one URL, yielding
//!   [`RpcOutcome::Live`] or [`RpcOutcome::Failed`].
//! - **Contract**: `eth_getCode` at an address, then the role's read-only
//!   interface call, yielding a [`ContractOutcome`].
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`ChainNetwork`] | Transport-agnostic network collaborator |
//! | [`JsonRpcClient`] | JSON-RPC 2.0 over HTTP implementation |
//! | [`EndpointProber`] | Per-call timeout + outcome classification |
//!
//! ## Failure model
//!
//! Every probe carries the same fixed timeout. Expiry cancels the in-flight
//! call and becomes a `Failed` outcome for that probe only; callers cannot
//! tell "slow" from "broken" beyond the message text. Nothing is retried.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chainreg_probe::{EndpointProber, JsonRpcClient, RpcOutcome};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), chainreg_probe::NetworkError> {
//! let timeout = Duration::from_secs(8);
//! let prober = EndpointProber::new(Arc::new(JsonRpcClient::new(timeout)?), timeout);
//!
//! match prober.probe_rpc("https://mainnet.optimism.io").await {
//!     RpcOutcome::Live(chain_id) => println!("live, chain {}", chain_id),
//!     RpcOutcome::Failed(message) => println!("down: {}", message),
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod http;
mod network;
mod prober;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{NetworkError, Result};
pub use http::JsonRpcClient;
pub use network::ChainNetwork;
pub use prober::{ContractOutcome, EndpointProber, RpcOutcome};
