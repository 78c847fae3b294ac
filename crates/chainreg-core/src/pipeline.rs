//! The unified verification facade.
//!
//! [`RegistryVerifier`] wires the liveness evaluator, the contract verifier
//! and the reconciler together and runs them over a whole registry.

use crate::config::VerifierConfig;
use crate::contracts::{ContractReport, ContractVerifier};
use crate::correction::{CorrectionPlan, CorrectionSet};
use crate::liveness::{LivenessEvaluator, LivenessReport};
use crate::reconcile::{Reconciler, Reconciliation};
use crate::Result;
use chainreg_probe::{ChainNetwork, EndpointProber, JsonRpcClient};
use chainreg_registry::{check_integrity, ChainDescriptor, IntegrityIssue, Registry, RoleTable};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Liveness and contract results for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Chain key.
    pub key: String,
    /// RPC liveness.
    pub liveness: LivenessReport,
    /// Contract checks; `None` when no endpoint was reachable.
    pub contracts: Option<ContractReport>,
}

impl ChainReport {
    /// Whether the chain had a reachable endpoint.
    pub fn is_resolvable(&self) -> bool {
        self.liveness.is_resolvable()
    }

    /// Liveness and contract corrections, without schema healing or backfill.
    pub fn corrections(&self) -> CorrectionSet {
        self.liveness
            .corrections()
            .merge(self.contracts.as_ref().map(ContractReport::corrections).unwrap_or_default())
    }
}

/// Verification and reconciliation over a whole registry.
///
/// Chains are independent and evaluated up to `concurrency` at a time;
/// results always come back in registry order. Within a chain every probe is
/// sequential.
///
/// # Example
///
/// ```rust,ignore
/// let verifier = RegistryVerifier::connect(&VerifierConfig::default())?;
/// let registry = RegistryFile::new("chains.json").load()?;
///
/// let result = verifier.fix(&registry).await;
/// if result.has_changes() {
///     print!("{}", result.log);
/// }
/// ```
pub struct RegistryVerifier {
    liveness: LivenessEvaluator,
    contracts: ContractVerifier,
    reconciler: Reconciler,
    concurrency: usize,
}

impl RegistryVerifier {
    /// Creates a verifier over a network collaborator, using the role table
    /// from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or its role table is
    /// malformed.
    pub fn new(network: Arc<dyn ChainNetwork>, config: &VerifierConfig) -> Result<Self> {
        let roles = config.role_table()?;
        Self::with_roles(network, config, roles)
    }

    /// Creates a verifier with an explicit role table.
    pub fn with_roles(
        network: Arc<dyn ChainNetwork>,
        config: &VerifierConfig,
        roles: RoleTable,
    ) -> Result<Self> {
        config.validate()?;

        let roles = Arc::new(roles);
        let prober = EndpointProber::new(network, config.timeout());

        info!(
            roles = roles.len(),
            timeout_ms = config.probe.timeout_ms,
            concurrency = config.probe.concurrency,
            strictness = ?config.probe.strictness,
            "Verifier initialized"
        );

        Ok(Self {
            liveness: LivenessEvaluator::new(prober.clone()),
            contracts: ContractVerifier::new(prober, roles.clone(), config.probe.strictness),
            reconciler: Reconciler::new(roles),
            concurrency: config.probe.concurrency,
        })
    }

    /// Creates a verifier talking JSON-RPC over HTTP.
    pub fn connect(config: &VerifierConfig) -> Result<Self> {
        let client = JsonRpcClient::new(config.timeout())?;
        Self::new(Arc::new(client), config)
    }

    /// The role table in use.
    pub fn roles(&self) -> &RoleTable {
        self.reconciler.roles()
    }

    /// Static integrity report. Never blocks later stages.
    pub fn check(&self, registry: &Registry) -> Vec<IntegrityIssue> {
        let issues = check_integrity(registry);
        for issue in &issues {
            warn!(%issue, "Integrity issue");
        }
        info!(chains = registry.len(), issues = issues.len(), "Integrity check complete");
        issues
    }

    /// RPC liveness for every chain.
    pub async fn verify_rpcs(&self, registry: &Registry) -> Vec<LivenessReport> {
        stream::iter(registry.chains())
            .map(|chain| self.liveness.evaluate(chain))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// RPC liveness and contract checks for every chain. Read-only.
    pub async fn verify_contracts(&self, registry: &Registry) -> Vec<ChainReport> {
        stream::iter(registry.chains())
            .map(|chain| self.evaluate_chain(chain))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Liveness, then contracts through the chosen endpoint.
    pub async fn evaluate_chain(&self, chain: &ChainDescriptor) -> ChainReport {
        let liveness = self.liveness.evaluate(chain).await;
        let contracts = match liveness.endpoint() {
            Some(endpoint) => Some(self.contracts.verify(chain, endpoint).await),
            None => {
                warn!(chain = %chain.key, "Skipping contract checks: no reachable endpoint");
                None
            }
        };

        ChainReport {
            key: chain.key.clone(),
            liveness,
            contracts,
        }
    }

    /// Full reconciliation: verifies every chain and derives the corrected
    /// registry. Nothing is written; persisting the result is the caller's
    /// decision.
    pub async fn fix(&self, registry: &Registry) -> Reconciliation {
        let reports = self.verify_contracts(registry).await;

        let mut plan = CorrectionPlan::new();
        for (position, (chain, report)) in registry.chains().iter().zip(&reports).enumerate() {
            let set = self.reconciler.reconcile_chain(
                chain,
                Some(&report.liveness),
                report.contracts.as_ref(),
            );
            plan.insert(position, chain.key.as_str(), set);
        }

        let result = self.reconciler.apply(registry, plan);
        info!(
            chains = result.plan.len(),
            changes = result.log.len(),
            "Reconciliation complete"
        );
        result
    }
}
