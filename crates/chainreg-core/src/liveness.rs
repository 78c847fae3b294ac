//! # RPC Liveness Evaluator
//!
//! Walks a chain's RPC endpoints in preference order and picks the one the
//! rest of the run talks to.
//!
//! ## Tie-break
//!
//! 1. The first endpoint reporting the configured chain id wins. Probing stops
//!    there; later endpoints are never contacted.
//! 2. Otherwise the first reachable endpoint wins, and its chain id is
//!    proposed as the registry's new `chainId`.
//! 3. Otherwise the chain is unresolvable and contract checks are skipped.
//!
//! Endpoint order is the preference ranking, so probes are sequential and
//! never fanned out.

use crate::correction::CorrectionSet;
use crate::verdict::{CorrectionReason, Verdict};
use chainreg_probe::{EndpointProber, RpcOutcome};
use chainreg_registry::ChainDescriptor;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::ops::ControlFlow;
use tracing::{info, warn};

/// How one endpoint compares to the configured chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EndpointClass {
    /// Reports the configured chain id.
    Matching,
    /// Reachable, but reports another chain id.
    Mismatching(u64),
    /// Unreachable.
    Failed,
}

impl EndpointClass {
    /// Classifies an outcome against the configured chain id.
    pub fn of(outcome: &RpcOutcome, expected: u64) -> Self {
        match outcome {
            RpcOutcome::Live(chain_id) if *chain_id == expected => Self::Matching,
            RpcOutcome::Live(chain_id) => Self::Mismatching(*chain_id),
            RpcOutcome::Failed(_) => Self::Failed,
        }
    }
}

/// One probed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointProbe {
    /// Position in `rpcEndpoints`.
    pub index: usize,
    /// URL.
    pub url: String,
    /// Raw outcome.
    pub outcome: RpcOutcome,
    /// Outcome relative to the configured chain id.
    pub class: EndpointClass,
}

impl fmt::Display for EndpointProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.index, self.url, self.outcome)
    }
}

/// The endpoint chosen for a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EndpointChoice {
    /// First endpoint reporting the configured chain id.
    Matching(usize),
    /// No endpoint matched; first reachable one and what it reported.
    Reachable {
        /// Position in `rpcEndpoints`.
        index: usize,
        /// Chain id it reported.
        chain_id: u64,
    },
    /// Nothing answered.
    Unreachable,
}

impl EndpointChoice {
    /// Index of the chosen endpoint.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Matching(index) | Self::Reachable { index, .. } => Some(*index),
            Self::Unreachable => None,
        }
    }
}

/// Running state of the ordered fold over endpoint outcomes.
#[derive(Debug, Default)]
struct EndpointTally {
    matching: Option<usize>,
    reachable: Option<(usize, u64)>,
}

impl EndpointTally {
    /// Records one outcome; breaks on the first match.
    fn observe(&mut self, index: usize, class: EndpointClass) -> ControlFlow<()> {
        match class {
            EndpointClass::Matching => {
                self.matching = Some(index);
                ControlFlow::Break(())
            }
            EndpointClass::Mismatching(chain_id) => {
                self.reachable.get_or_insert((index, chain_id));
                ControlFlow::Continue(())
            }
            EndpointClass::Failed => ControlFlow::Continue(()),
        }
    }

    fn choice(self) -> EndpointChoice {
        match (self.matching, self.reachable) {
            (Some(index), _) => EndpointChoice::Matching(index),
            (None, Some((index, chain_id))) => EndpointChoice::Reachable { index, chain_id },
            (None, None) => EndpointChoice::Unreachable,
        }
    }
}

/// Applies the tie-break to outcomes already in preference order.
///
/// ```rust
/// use chainreg_core::liveness::{choose_endpoint, EndpointChoice};
/// use chainreg_probe::RpcOutcome;
///
/// let outcomes = [
///     RpcOutcome::Failed("connection refused".into()),
///     RpcOutcome::Live(7),
///     RpcOutcome::Live(1),
/// ];
/// assert_eq!(choose_endpoint(1, &outcomes), EndpointChoice::Matching(2));
/// ```
pub fn choose_endpoint(expected: u64, outcomes: &[RpcOutcome]) -> EndpointChoice {
    let mut tally = EndpointTally::default();
    for (index, outcome) in outcomes.iter().enumerate() {
        if tally
            .observe(index, EndpointClass::of(outcome, expected))
            .is_break()
        {
            break;
        }
    }
    tally.choice()
}

/// Liveness result for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessReport {
    /// Chain key.
    pub key: String,

    /// Every endpoint actually probed, in order.
    pub probes: Vec<EndpointProbe>,

    /// The chosen endpoint.
    pub choice: EndpointChoice,

    /// Verdict on `preferredRpcIndex`.
    pub preferred_rpc_index: Verdict<usize>,

    /// Verdict on `chainId`.
    pub chain_id: Verdict<u64>,
}

impl LivenessReport {
    /// URL of the chosen endpoint; `None` when the chain is unresolvable.
    pub fn endpoint(&self) -> Option<&str> {
        let index = self.choice.index()?;
        self.probes
            .iter()
            .find(|probe| probe.index == index)
            .map(|probe| probe.url.as_str())
    }

    /// Whether an endpoint was found.
    pub fn is_resolvable(&self) -> bool {
        self.choice != EndpointChoice::Unreachable
    }

    /// Corrections proposed by liveness.
    pub fn corrections(&self) -> CorrectionSet {
        CorrectionSet {
            preferred_rpc_index: self.preferred_rpc_index.fix(),
            chain_id: self.chain_id.fix(),
            ..CorrectionSet::default()
        }
    }
}

/// Evaluates RPC liveness for one chain at a time.
#[derive(Clone)]
pub struct LivenessEvaluator {
    prober: EndpointProber,
}

impl LivenessEvaluator {
    /// Creates an evaluator over a shared prober.
    pub fn new(prober: EndpointProber) -> Self {
        Self { prober }
    }

    /// Probes `chain`'s endpoints in order until one matches.
    pub async fn evaluate(&self, chain: &ChainDescriptor) -> LivenessReport {
        if chain.rpc_endpoints.is_empty() {
            warn!(chain = %chain.key, "No RPC endpoints configured");
            return Self::report(
                chain,
                Vec::new(),
                EndpointChoice::Unreachable,
                "no rpc endpoints configured".to_string(),
            );
        }

        // Lazy: the next endpoint is only probed when the fold asks for it.
        let outcomes = stream::iter(chain.rpc_endpoints.iter().enumerate()).then(
            |(index, url)| async move { (index, url, self.prober.probe_rpc(url).await) },
        );
        let mut outcomes = std::pin::pin!(outcomes);

        let mut tally = EndpointTally::default();
        let mut probes = Vec::new();
        while let Some((index, url, outcome)) = outcomes.next().await {
            let class = EndpointClass::of(&outcome, chain.chain_id);
            if let RpcOutcome::Failed(message) = &outcome {
                warn!(chain = %chain.key, url = %url, error = %message, "RPC endpoint failed");
            } else {
                info!(chain = %chain.key, url = %url, ?class, "RPC endpoint answered");
            }
            probes.push(EndpointProbe {
                index,
                url: url.clone(),
                outcome,
                class,
            });
            if tally.observe(index, class).is_break() {
                break;
            }
        }

        let reason = format!("no reachable rpc endpoint ({} probed)", probes.len());
        let report = Self::report(chain, probes, tally.choice(), reason);
        match &report.choice {
            EndpointChoice::Unreachable => {
                warn!(chain = %chain.key, "Chain unresolvable: no reachable RPC endpoint");
            }
            choice => {
                info!(
                    chain = %chain.key,
                    endpoint = report.endpoint().unwrap_or_default(),
                    rpc = %report.preferred_rpc_index,
                    chain_id = %report.chain_id,
                    ?choice,
                    "RPC liveness"
                );
            }
        }
        report
    }

    fn report(
        chain: &ChainDescriptor,
        probes: Vec<EndpointProbe>,
        choice: EndpointChoice,
        unresolvable: String,
    ) -> LivenessReport {
        let index_verdict = |index: usize| {
            if index == chain.preferred_rpc_index {
                Verdict::Verified(index)
            } else {
                Verdict::correct(index, CorrectionReason::PreferredEndpoint)
            }
        };

        let (preferred_rpc_index, chain_id) = match choice {
            EndpointChoice::Matching(index) => {
                (index_verdict(index), Verdict::Verified(chain.chain_id))
            }
            EndpointChoice::Reachable { index, chain_id } => (
                index_verdict(index),
                Verdict::correct(chain_id, CorrectionReason::ChainIdMismatch),
            ),
            EndpointChoice::Unreachable => (
                Verdict::Unresolvable(unresolvable.clone()),
                Verdict::Unresolvable(unresolvable),
            ),
        };

        LivenessReport {
            key: chain.key.clone(),
            probes,
            choice,
            preferred_rpc_index,
            chain_id,
        }
    }
}
