//! Scripted in-memory network for tests.
//!
//! Endpoints are scripted per URL; contract state is scripted per
//! `(chain id, address)`, so every live endpoint of the same chain sees the
//! same deployments. Every request is recorded for ordering assertions.
//!
//! ```rust
//! use chainreg_probe::mock::ScriptedNetwork;
//! use alloy_primitives::address;
//!
//! let network = ScriptedNetwork::new()
//!     .failing("https://a", "connection refused")
//!     .live("https://b", 10)
//!     .deployed(10, address!("0x000000000022D473030F116dDEE9F6B43aC78BA3"));
//! # drop(network);
//! ```

use crate::error::{NetworkError, Result};
use crate::network::ChainNetwork;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

const RUNTIME_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

#[derive(Debug, Clone)]
enum EndpointScript {
    Live(u64),
    Degraded(u64, String),
    Failing(String),
    Hanging,
}

#[derive(Debug, Clone)]
enum ContractScript {
    Deployed,
    Reverting,
    Silent,
    Unreachable(String),
}

/// A network whose every answer is decided up front.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    endpoints: HashMap<String, EndpointScript>,
    contracts: HashMap<(u64, Address), ContractScript>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    /// An empty network: every endpoint is unknown and fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// `url` answers for `chain_id`.
    #[must_use]
    pub fn live(mut self, url: &str, chain_id: u64) -> Self {
        self.endpoints
            .insert(url.to_string(), EndpointScript::Live(chain_id));
        self
    }

    /// `url` answers `eth_chainId` but every state query fails.
    #[must_use]
    pub fn degraded(mut self, url: &str, chain_id: u64, message: &str) -> Self {
        self.endpoints.insert(
            url.to_string(),
            EndpointScript::Degraded(chain_id, message.to_string()),
        );
        self
    }

    /// `url` fails every request.
    #[must_use]
    pub fn failing(mut self, url: &str, message: &str) -> Self {
        self.endpoints
            .insert(url.to_string(), EndpointScript::Failing(message.to_string()));
        self
    }

    /// `url` never answers.
    #[must_use]
    pub fn hanging(mut self, url: &str) -> Self {
        self.endpoints.insert(url.to_string(), EndpointScript::Hanging);
        self
    }

    /// Bytecode at `address` whose interface calls succeed.
    #[must_use]
    pub fn deployed(self, chain_id: u64, address: Address) -> Self {
        self.contract(chain_id, address, ContractScript::Deployed)
    }

    /// Bytecode at `address` whose interface calls revert.
    #[must_use]
    pub fn reverting(self, chain_id: u64, address: Address) -> Self {
        self.contract(chain_id, address, ContractScript::Reverting)
    }

    /// Bytecode at `address` whose interface calls return no data.
    #[must_use]
    pub fn silent(self, chain_id: u64, address: Address) -> Self {
        self.contract(chain_id, address, ContractScript::Silent)
    }

    /// Code lookups at `address` fail.
    #[must_use]
    pub fn unreachable(self, chain_id: u64, address: Address, message: &str) -> Self {
        self.contract(
            chain_id,
            address,
            ContractScript::Unreachable(message.to_string()),
        )
    }

    fn contract(mut self, chain_id: u64, address: Address, script: ContractScript) -> Self {
        self.contracts.insert((chain_id, address), script);
        self
    }

    /// Requests received so far, as `"<method> <url> [<address>]"`.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of requests of one method.
    pub fn count(&self, method: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.split(' ').next() == Some(method))
            .count()
    }

    fn record(&self, entry: String) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    async fn identity(&self, url: &str) -> Result<u64> {
        match self.endpoints.get(url) {
            Some(EndpointScript::Live(chain_id)) | Some(EndpointScript::Degraded(chain_id, _)) => {
                Ok(*chain_id)
            }
            Some(EndpointScript::Failing(message)) => {
                Err(NetworkError::Transport(message.clone()))
            }
            Some(EndpointScript::Hanging) => std::future::pending().await,
            None => Err(NetworkError::Transport(format!("unknown endpoint {}", url))),
        }
    }

    async fn state(&self, url: &str) -> Result<u64> {
        match self.endpoints.get(url) {
            Some(EndpointScript::Degraded(_, message)) => {
                Err(NetworkError::Transport(message.clone()))
            }
            _ => self.identity(url).await,
        }
    }
}

#[async_trait]
impl ChainNetwork for ScriptedNetwork {
    async fn chain_id(&self, url: &str) -> Result<u64> {
        self.record(format!("eth_chainId {}", url));
        self.identity(url).await
    }

    async fn get_code(&self, url: &str, address: Address) -> Result<Bytes> {
        self.record(format!("eth_getCode {} {}", url, address));
        let chain_id = self.state(url).await?;
        match self.contracts.get(&(chain_id, address)) {
            None => Ok(Bytes::new()),
            Some(ContractScript::Unreachable(message)) => {
                Err(NetworkError::Transport(message.clone()))
            }
            Some(_) => Ok(Bytes::from_static(RUNTIME_CODE)),
        }
    }

    async fn call(&self, url: &str, to: Address, _data: Bytes) -> Result<Bytes> {
        self.record(format!("eth_call {} {}", url, to));
        let chain_id = self.state(url).await?;
        match self.contracts.get(&(chain_id, to)) {
            Some(ContractScript::Deployed) => {
                let mut word = vec![0u8; 32];
                word[31] = 6;
                Ok(Bytes::from(word))
            }
            Some(ContractScript::Reverting) => Err(NetworkError::Rpc {
                code: 3,
                message: "execution reverted".to_string(),
            }),
            Some(ContractScript::Unreachable(message)) => {
                Err(NetworkError::Transport(message.clone()))
            }
            Some(ContractScript::Silent) | None => Ok(Bytes::new()),
        }
    }
}
