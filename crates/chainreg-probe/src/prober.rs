//! Probe execution and outcome classification.

use crate::error::NetworkError;
use crate::network::ChainNetwork;
use alloy_primitives::Address;
use chainreg_registry::ProbeMethod;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Outcome of an RPC liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RpcOutcome {
    /// The endpoint answered with this chain id.
    Live(u64),
    /// The endpoint could not be reached or answered garbage.
    Failed(String),
}

impl fmt::Display for RpcOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live(chain_id) => write!(f, "live (chainId {})", chain_id),
            Self::Failed(message) => write!(f, "failed ({})", message),
        }
    }
}

/// Outcome of a contract probe at one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ContractOutcome {
    /// No bytecode at the address.
    NoCode,

    /// Bytecode present and the interface probe succeeded, or the role has
    /// no probe.
    Verified,

    /// Bytecode present but the interface probe could not be confirmed.
    ///
    /// Many proxies and minimal contracts do not expose a cheap probe, so this
    /// still counts as deployed.
    HasCodeUnverifiedInterface(String),

    /// The code lookup itself failed. Says nothing about deployment.
    Failed(String),
}

impl ContractOutcome {
    /// Whether bytecode was observed.
    pub fn has_code(&self) -> bool {
        matches!(self, Self::Verified | Self::HasCodeUnverifiedInterface(_))
    }
}

impl fmt::Display for ContractOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCode => write!(f, "no code"),
            Self::Verified => write!(f, "verified"),
            Self::HasCodeUnverifiedInterface(reason) => {
                write!(f, "has code, interface unconfirmed ({})", reason)
            }
            Self::Failed(message) => write!(f, "probe failed ({})", message),
        }
    }
}

/// Runs single probes with a fixed per-call timeout.
///
/// The prober is stateless apart from its collaborator, so it is shared by
/// every chain evaluated in a run.
#[derive(Clone)]
pub struct EndpointProber {
    network: Arc<dyn ChainNetwork>,
    timeout: Duration,
}

impl EndpointProber {
    /// Creates a prober over a network collaborator.
    pub fn new(network: Arc<dyn ChainNetwork>, timeout: Duration) -> Self {
        Self { network, timeout }
    }

    /// The per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Asks an endpoint for its chain id.
    pub async fn probe_rpc(&self, url: &str) -> RpcOutcome {
        let outcome = match self.bounded(self.network.chain_id(url)).await {
            Ok(chain_id) => RpcOutcome::Live(chain_id),
            Err(err) => RpcOutcome::Failed(err.to_string()),
        };
        info!(url, %outcome, "RPC probe");
        outcome
    }

    /// Probes bytecode at `address`, then the interface method if any.
    pub async fn probe_contract(
        &self,
        url: &str,
        address: Address,
        probe: Option<&ProbeMethod>,
    ) -> ContractOutcome {
        let outcome = self.classify_contract(url, address, probe).await;
        info!(url, %address, %outcome, "Contract probe");
        outcome
    }

    async fn classify_contract(
        &self,
        url: &str,
        address: Address,
        probe: Option<&ProbeMethod>,
    ) -> ContractOutcome {
        let code = match self.bounded(self.network.get_code(url, address)).await {
            Ok(code) => code,
            Err(err) => return ContractOutcome::Failed(err.to_string()),
        };
        if code.is_empty() {
            return ContractOutcome::NoCode;
        }

        let Some(probe) = probe else {
            return ContractOutcome::Verified;
        };

        match self
            .bounded(self.network.call(url, address, probe.calldata()))
            .await
        {
            Ok(data) if data.is_empty() => ContractOutcome::HasCodeUnverifiedInterface(format!(
                "{} returned no data",
                probe.signature
            )),
            Ok(_) => ContractOutcome::Verified,
            Err(err) => {
                ContractOutcome::HasCodeUnverifiedInterface(format!("{}: {}", probe.signature, err))
            }
        }
    }

    /// Applies the probe timeout; expiry drops (cancels) the inner future.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = crate::Result<T>>,
    ) -> crate::Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout {
                millis: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
