//! # Contract Verifier
//!
//! Checks every role of a chain against on-chain bytecode through the
//! endpoint chosen by the liveness evaluator.
//!
//! ## Rules
//!
//! | Configured | Observation | Verdict |
//! |------------|-------------|---------|
//! | non-zero | code at configured | verified (checksum fix only) |
//! | non-zero | no code, code at default | replace with default |
//! | non-zero | no code, no code at default | downgrade to zero |
//! | non-zero | probe failed | unresolvable, unchanged |
//! | zero / missing / invalid | code at default | upgrade to default |
//! | zero / missing / invalid | no code at default | stays zero |
//! | extra role | no code | unresolvable, unchanged |
//!
//! A configured address with bytecode is never overwritten, whatever its
//! interface probe says. A failed lookup is never read as "no code".

use crate::config::InterfaceStrictness;
use crate::correction::{CorrectionSet, Fix};
use crate::verdict::{CorrectionReason, Verdict};
use chainreg_probe::{ContractOutcome, EndpointProber};
use chainreg_registry::address::{self, AddressLiteral};
use chainreg_registry::{Address, ChainDescriptor, RoleKind, RoleSpec, RoleTable, ZERO_ADDRESS};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of checking one role on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCheck {
    /// Role name.
    pub role: String,

    /// Kind from the role table; `None` for roles outside it.
    pub kind: Option<RoleKind>,

    /// Literal as configured; `None` when the role is missing.
    pub configured: Option<String>,

    /// Probe of the configured address, when one was made.
    pub outcome: Option<ContractOutcome>,

    /// Probe of the role's default address, when one was made.
    pub default_outcome: Option<ContractOutcome>,

    /// The verdict on the role's address.
    pub verdict: Verdict<String>,

    /// Literal normalization that applies whatever the verdict.
    pub literal_fix: Option<Fix<String>>,
}

impl RoleCheck {
    /// Whether the role is outside the role table.
    pub fn is_extra(&self) -> bool {
        self.kind.is_none()
    }

    /// The address change proposed for this role, if any.
    pub fn correction(&self) -> Option<Fix<String>> {
        self.verdict.fix().or_else(|| self.literal_fix.clone())
    }
}

impl fmt::Display for RoleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.verdict)?;
        if let Some(outcome) = &self.outcome {
            write!(f, " [{}]", outcome)?;
        }
        if let Some(fix) = self.literal_fix.as_ref().filter(|_| !self.verdict.needs_correction()) {
            write!(f, " ({} -> {})", fix.reason, fix.value)?;
        }
        Ok(())
    }
}

/// Contract checks for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractReport {
    /// Chain key.
    pub key: String,
    /// Endpoint every probe went through.
    pub endpoint: String,
    /// Table roles in table order, then extra roles in descriptor order.
    pub roles: Vec<RoleCheck>,
}

impl ContractReport {
    /// Address corrections for the chain.
    pub fn corrections(&self) -> CorrectionSet {
        let mut set = CorrectionSet::new();
        for check in &self.roles {
            if let Some(fix) = check.correction() {
                set.addresses.insert(check.role.clone(), fix);
            }
        }
        set
    }

    /// Roles that could not be resolved.
    pub fn unresolvable(&self) -> impl Iterator<Item = &RoleCheck> {
        self.roles.iter().filter(|check| check.verdict.is_unresolvable())
    }

    /// The check for one role.
    pub fn role(&self, name: &str) -> Option<&RoleCheck> {
        self.roles.iter().find(|check| check.role == name)
    }
}

/// Normalization a literal needs regardless of on-chain state.
pub(crate) fn literal_fix(literal: &AddressLiteral) -> Option<Fix<String>> {
    match literal {
        AddressLiteral::NonCanonical { canonical, .. } => {
            Some(Fix::new(canonical.clone(), CorrectionReason::ChecksumMismatch))
        }
        AddressLiteral::Invalid(_) => Some(Fix::new(
            ZERO_ADDRESS.to_string(),
            CorrectionReason::InvalidAddress,
        )),
        AddressLiteral::Zero | AddressLiteral::Canonical(_) => None,
    }
}

/// What a probe outcome proves, under the configured strictness.
enum Evidence {
    Deployed,
    Unconfirmed(String),
    Absent,
    Unknown(String),
}

/// Verifies contract roles against on-chain bytecode.
#[derive(Clone)]
pub struct ContractVerifier {
    prober: EndpointProber,
    roles: Arc<RoleTable>,
    strictness: InterfaceStrictness,
}

impl ContractVerifier {
    /// Creates a verifier for a role table.
    pub fn new(prober: EndpointProber, roles: Arc<RoleTable>, strictness: InterfaceStrictness) -> Self {
        Self {
            prober,
            roles,
            strictness,
        }
    }

    /// The role table.
    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    /// Checks every table role, then every extra role, one after another.
    pub async fn verify(&self, chain: &ChainDescriptor, endpoint: &str) -> ContractReport {
        let mut checks = Vec::with_capacity(self.roles.len() + chain.addresses.len());
        for role in self.roles.iter() {
            let check = self.check_role(chain, endpoint, role).await;
            log_check(&chain.key, &check);
            checks.push(check);
        }

        for (name, literal) in &chain.addresses {
            if self.roles.contains(name) {
                continue;
            }
            let check = self.check_extra(endpoint, name, literal).await;
            log_check(&chain.key, &check);
            checks.push(check);
        }

        ContractReport {
            key: chain.key.clone(),
            endpoint: endpoint.to_string(),
            roles: checks,
        }
    }

    async fn check_role(&self, chain: &ChainDescriptor, endpoint: &str, role: &RoleSpec) -> RoleCheck {
        let configured = chain.address(&role.name).map(str::to_string);
        let literal = configured.as_deref().map(address::classify);

        let mut check = RoleCheck {
            role: role.name.clone(),
            kind: Some(role.kind),
            configured,
            outcome: None,
            default_outcome: None,
            verdict: Verdict::Verified(ZERO_ADDRESS.to_string()),
            literal_fix: literal.as_ref().and_then(literal_fix),
        };

        check.verdict = match literal.as_ref().and_then(AddressLiteral::address) {
            Some(configured) => self.judge_configured(&mut check, endpoint, role, configured).await,
            None => {
                let fallback = match &literal {
                    None => Verdict::correct(ZERO_ADDRESS.to_string(), CorrectionReason::MissingRole),
                    Some(AddressLiteral::Invalid(_)) => {
                        Verdict::correct(ZERO_ADDRESS.to_string(), CorrectionReason::InvalidAddress)
                    }
                    Some(_) => Verdict::Verified(ZERO_ADDRESS.to_string()),
                };
                self.judge_unset(&mut check, endpoint, role, fallback).await
            }
        };
        check
    }

    /// Non-zero configured address.
    async fn judge_configured(
        &self,
        check: &mut RoleCheck,
        endpoint: &str,
        role: &RoleSpec,
        configured: Address,
    ) -> Verdict<String> {
        let outcome = self
            .prober
            .probe_contract(endpoint, configured, role.probe.as_ref())
            .await;
        let evidence = self.evidence(&outcome);
        check.outcome = Some(outcome);

        match evidence {
            Evidence::Deployed => Verdict::Verified(address::checksum(&configured)),
            Evidence::Unconfirmed(reason) => {
                Verdict::unresolvable(format!("interface unconfirmed: {}", reason))
            }
            Evidence::Unknown(message) => Verdict::unresolvable(format!("probe failed: {}", message)),
            Evidence::Absent => {
                let Some(default) = role.default_address.filter(|d| *d != configured) else {
                    return Verdict::correct(ZERO_ADDRESS.to_string(), CorrectionReason::NoBytecode);
                };
                match self.probe_default(check, endpoint, role, default).await {
                    Evidence::Deployed => Verdict::correct(
                        address::checksum(&default),
                        CorrectionReason::ReplacedWithDefault,
                    ),
                    Evidence::Absent => {
                        Verdict::correct(ZERO_ADDRESS.to_string(), CorrectionReason::NoBytecode)
                    }
                    Evidence::Unconfirmed(reason) => Verdict::unresolvable(format!(
                        "no bytecode at configured address, default interface unconfirmed: {}",
                        reason
                    )),
                    Evidence::Unknown(message) => Verdict::unresolvable(format!(
                        "no bytecode at configured address, default probe failed: {}",
                        message
                    )),
                }
            }
        }
    }

    /// Zero, missing or invalid literal: only a deployed default upgrades it.
    async fn judge_unset(
        &self,
        check: &mut RoleCheck,
        endpoint: &str,
        role: &RoleSpec,
        fallback: Verdict<String>,
    ) -> Verdict<String> {
        let Some(default) = role.default_address else {
            return fallback;
        };
        match self.probe_default(check, endpoint, role, default).await {
            Evidence::Deployed => Verdict::correct(
                address::checksum(&default),
                CorrectionReason::FoundBytecodeAtDefault,
            ),
            Evidence::Absent => fallback,
            Evidence::Unconfirmed(reason) => {
                Verdict::unresolvable(format!("default interface unconfirmed: {}", reason))
            }
            Evidence::Unknown(message) => {
                Verdict::unresolvable(format!("default probe failed: {}", message))
            }
        }
    }

    /// Roles outside the table: bytecode presence only, never defaulted.
    async fn check_extra(&self, endpoint: &str, name: &str, literal: &str) -> RoleCheck {
        let classified = address::classify(literal);
        let mut check = RoleCheck {
            role: name.to_string(),
            kind: None,
            configured: Some(literal.to_string()),
            outcome: None,
            default_outcome: None,
            verdict: Verdict::Verified(ZERO_ADDRESS.to_string()),
            literal_fix: literal_fix(&classified),
        };

        check.verdict = match &classified {
            AddressLiteral::Zero => Verdict::Verified(ZERO_ADDRESS.to_string()),
            AddressLiteral::Invalid(_) => {
                Verdict::correct(ZERO_ADDRESS.to_string(), CorrectionReason::InvalidAddress)
            }
            AddressLiteral::Canonical(address) | AddressLiteral::NonCanonical { address, .. } => {
                let outcome = self.prober.probe_contract(endpoint, *address, None).await;
                let verdict = match &outcome {
                    ContractOutcome::NoCode => {
                        Verdict::unresolvable("no bytecode at configured address")
                    }
                    ContractOutcome::Failed(message) => {
                        Verdict::unresolvable(format!("probe failed: {}", message))
                    }
                    ContractOutcome::Verified | ContractOutcome::HasCodeUnverifiedInterface(_) => {
                        Verdict::Verified(address::checksum(address))
                    }
                };
                check.outcome = Some(outcome);
                verdict
            }
        };
        check
    }

    async fn probe_default(
        &self,
        check: &mut RoleCheck,
        endpoint: &str,
        role: &RoleSpec,
        default: Address,
    ) -> Evidence {
        let outcome = self
            .prober
            .probe_contract(endpoint, default, role.probe.as_ref())
            .await;
        let evidence = self.evidence(&outcome);
        check.default_outcome = Some(outcome);
        evidence
    }

    fn evidence(&self, outcome: &ContractOutcome) -> Evidence {
        match outcome {
            ContractOutcome::Verified => Evidence::Deployed,
            ContractOutcome::HasCodeUnverifiedInterface(reason) => match self.strictness {
                InterfaceStrictness::Permissive => Evidence::Deployed,
                InterfaceStrictness::Strict => Evidence::Unconfirmed(reason.clone()),
            },
            ContractOutcome::NoCode => Evidence::Absent,
            ContractOutcome::Failed(message) => Evidence::Unknown(message.clone()),
        }
    }
}

fn log_check(chain: &str, check: &RoleCheck) {
    match &check.verdict {
        Verdict::Unresolvable(reason) => {
            warn!(chain, role = %check.role, %reason, "Role unresolvable");
        }
        Verdict::NeedsCorrection { value, reason } => {
            info!(chain, role = %check.role, %value, %reason, "Role needs correction");
        }
        Verdict::Verified(value) => match &check.literal_fix {
            Some(fix) => info!(chain, role = %check.role, value = %fix.value, reason = %fix.reason, "Role verified, literal normalized"),
            None => info!(chain, role = %check.role, %value, "Role verified"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use chainreg_probe::mock::ScriptedNetwork;
    use chainreg_registry::ProbeMethod;
    use std::time::Duration;

    const URL: &str = "https://rpc";
    const PERMIT2: Address = address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");
    const CUSTOM: Address = address!("0x1111111111111111111111111111111111111111");
    const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

    fn table() -> Arc<RoleTable> {
        Arc::new(
            RoleTable::from_specs(vec![
                RoleSpec::new("usdc", RoleKind::Token).with_probe(ProbeMethod::new("decimals()")),
                RoleSpec::new("permit2", RoleKind::Protocol)
                    .with_default(PERMIT2)
                    .with_probe(ProbeMethod::new("DOMAIN_SEPARATOR()")),
            ])
            .unwrap(),
        )
    }

    fn verifier(network: ScriptedNetwork, strictness: InterfaceStrictness) -> ContractVerifier {
        let prober = EndpointProber::new(Arc::new(network.live(URL, 1)), Duration::from_secs(1));
        ContractVerifier::new(prober, table(), strictness)
    }

    fn chain() -> ChainDescriptor {
        ChainDescriptor::new("eth", 1).with_rpc(URL)
    }

    async fn check(
        network: ScriptedNetwork,
        strictness: InterfaceStrictness,
        chain: ChainDescriptor,
        role: &str,
    ) -> RoleCheck {
        let report = verifier(network, strictness).verify(&chain, URL).await;
        report.role(role).cloned().unwrap()
    }

    #[tokio::test]
    async fn test_configured_with_code_is_verified() {
        let chain = chain().with_address("permit2", PERMIT2.to_checksum(None));
        let check = check(
            ScriptedNetwork::new().deployed(1, PERMIT2),
            InterfaceStrictness::Permissive,
            chain,
            "permit2",
        )
        .await;
        assert!(check.verdict.is_verified());
        assert!(check.correction().is_none());
    }

    #[tokio::test]
    async fn test_lowercase_literal_gets_checksum_fix_only() {
        let literal = PERMIT2.to_checksum(None).to_lowercase();
        let chain = chain().with_address("permit2", literal);
        let check = check(
            ScriptedNetwork::new().deployed(1, PERMIT2),
            InterfaceStrictness::Permissive,
            chain,
            "permit2",
        )
        .await;
        assert!(check.verdict.is_verified());
        assert_eq!(
            check.correction(),
            Some(Fix::new(
                "0x000000000022D473030F116dDEE9F6B43aC78BA3".to_string(),
                CorrectionReason::ChecksumMismatch
            ))
        );
    }

    #[tokio::test]
    async fn test_reverting_interface_never_downgrades() {
        for strictness in [InterfaceStrictness::Permissive, InterfaceStrictness::Strict] {
            let chain = chain().with_address("permit2", CUSTOM.to_checksum(None));
            let check = check(
                ScriptedNetwork::new().reverting(1, CUSTOM),
                strictness,
                chain,
                "permit2",
            )
            .await;
            assert!(check.correction().is_none(), "{:?}: {:?}", strictness, check);
            assert_eq!(
                check.verdict.is_unresolvable(),
                strictness == InterfaceStrictness::Strict
            );
        }
    }

    #[tokio::test]
    async fn test_no_code_falls_back_to_default() {
        let chain = chain().with_address("permit2", CUSTOM.to_checksum(None));
        let check = check(
            ScriptedNetwork::new().deployed(1, PERMIT2),
            InterfaceStrictness::Permissive,
            chain,
            "permit2",
        )
        .await;
        assert_eq!(
            check.verdict,
            Verdict::correct(PERMIT2.to_checksum(None), CorrectionReason::ReplacedWithDefault)
        );
    }

    #[tokio::test]
    async fn test_no_code_anywhere_downgrades_to_zero() {
        let chain = chain().with_address("permit2", CUSTOM.to_checksum(None));
        let check = check(
            ScriptedNetwork::new(),
            InterfaceStrictness::Permissive,
            chain,
            "permit2",
        )
        .await;
        assert_eq!(
            check.verdict,
            Verdict::correct(ZERO_ADDRESS.to_string(), CorrectionReason::NoBytecode)
        );
    }

    #[tokio::test]
    async fn test_default_probe_failure_leaves_address() {
        let chain = chain().with_address("permit2", CUSTOM.to_checksum(None));
        let check = check(
            ScriptedNetwork::new().unreachable(1, PERMIT2, "rate limited"),
            InterfaceStrictness::Permissive,
            chain,
            "permit2",
        )
        .await;
        assert!(check.verdict.is_unresolvable());
        assert!(check.correction().is_none());
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_absence() {
        let chain = chain().with_address("usdc", USDC.to_checksum(None).to_lowercase());
        let check = check(
            ScriptedNetwork::new().unreachable(1, USDC, "rate limited"),
            InterfaceStrictness::Permissive,
            chain,
            "usdc",
        )
        .await;
        assert!(check.verdict.is_unresolvable());
        assert_eq!(check.correction().unwrap().reason, CorrectionReason::ChecksumMismatch);
    }

    #[tokio::test]
    async fn test_zero_upgrades_to_deployed_default() {
        let chain = chain().with_address("permit2", ZERO_ADDRESS);
        let check = check(
            ScriptedNetwork::new().deployed(1, PERMIT2),
            InterfaceStrictness::Permissive,
            chain,
            "permit2",
        )
        .await;
        assert_eq!(
            check.verdict,
            Verdict::correct(PERMIT2.to_checksum(None), CorrectionReason::FoundBytecodeAtDefault)
        );
        assert!(check.outcome.is_none());
    }

    #[tokio::test]
    async fn test_zero_without_default_code_stays_zero() {
        let chain = chain().with_address("permit2", ZERO_ADDRESS);
        let check = check(
            ScriptedNetwork::new(),
            InterfaceStrictness::Permissive,
            chain,
            "permit2",
        )
        .await;
        assert_eq!(check.verdict, Verdict::Verified(ZERO_ADDRESS.to_string()));
        assert!(check.correction().is_none());
        assert_eq!(check.default_outcome, Some(ContractOutcome::NoCode));
    }

    #[tokio::test]
    async fn test_strict_does_not_upgrade_on_unconfirmed_default() {
        let chain = chain().with_address("permit2", ZERO_ADDRESS);
        let check = check(
            ScriptedNetwork::new().silent(1, PERMIT2),
            InterfaceStrictness::Strict,
            chain,
            "permit2",
        )
        .await;
        assert!(check.verdict.is_unresolvable());
        assert!(check.correction().is_none());
    }

    #[tokio::test]
    async fn test_missing_and_invalid_roles() {
        let chain = chain().with_address("permit2", "0x0");
        let report = verifier(ScriptedNetwork::new(), InterfaceStrictness::Permissive)
            .verify(&chain, URL)
            .await;

        assert_eq!(
            report.role("usdc").unwrap().verdict,
            Verdict::correct(ZERO_ADDRESS.to_string(), CorrectionReason::MissingRole)
        );
        assert_eq!(
            report.role("permit2").unwrap().correction().unwrap().reason,
            CorrectionReason::InvalidAddress
        );
    }

    #[tokio::test]
    async fn test_extra_role_never_defaulted_or_zeroed() {
        let chain = chain()
            .with_address("usdc", ZERO_ADDRESS)
            .with_address("permit2", ZERO_ADDRESS)
            .with_address("pyusd", CUSTOM.to_checksum(None));
        let report = verifier(ScriptedNetwork::new(), InterfaceStrictness::Permissive)
            .verify(&chain, URL)
            .await;

        let extra = report.role("pyusd").unwrap();
        assert!(extra.is_extra());
        assert!(extra.verdict.is_unresolvable());
        assert!(extra.correction().is_none());
        assert!(report.corrections().is_empty());
        assert_eq!(report.unresolvable().count(), 1);
    }

    #[tokio::test]
    async fn test_roles_checked_in_table_order_then_extras() {
        let chain = chain()
            .with_address("pyusd", ZERO_ADDRESS)
            .with_address("permit2", ZERO_ADDRESS)
            .with_address("usdc", ZERO_ADDRESS);
        let report = verifier(ScriptedNetwork::new(), InterfaceStrictness::Permissive)
            .verify(&chain, URL)
            .await;
        let order: Vec<&str> = report.roles.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(order, vec!["usdc", "permit2", "pyusd"]);
    }
}
