//! The network collaborator consumed by the prober.

use crate::error::Result;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

/// Minimal capability set the verifier needs from a live network.
///
/// Implementations are transport-agnostic; any JSON-RPC client satisfies this.
/// Timeouts are applied by the caller, so implementations may block as long
/// as their transport allows.
#[async_trait]
pub trait ChainNetwork: Send + Sync {
    /// Live chain identity reported by the endpoint (`eth_chainId`).
    async fn chain_id(&self, url: &str) -> Result<u64>;

    /// Deployed bytecode at `address` (`eth_getCode` at `latest`).
    async fn get_code(&self, url: &str, address: Address) -> Result<Bytes>;

    /// Read-only call against `to` (`eth_call` at `latest`).
    async fn call(&self, url: &str, to: Address, data: Bytes) -> Result<Bytes>;
}
