//! Run configuration.
//!
//! Loaded from TOML; every field has a default, so an empty file is a valid
//! configuration.
//!
//! ```toml
//! [probe]
//! timeout_ms = 5000
//! concurrency = 8
//! strictness = "strict"
//!
//! [[roles]]
//! name = "permit2"
//! kind = "protocol"
//! defaultAddress = "0x000000000022D473030F116dDEE9F6B43aC78BA3"
//! probe = { signature = "DOMAIN_SEPARATOR()" }
//! ```

use crate::error::VerifierError;
use crate::Result;
use chainreg_registry::{RoleSpecEntry, RoleTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How a contract whose interface probe could not be confirmed is judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceStrictness {
    /// Bytecode alone is enough; an unconfirmed interface still verifies.
    #[default]
    Permissive,
    /// An unconfirmed interface leaves the role unresolvable. The configured
    /// address is still never downgraded.
    Strict,
}

/// Probe settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Chains evaluated at once. Probes within a chain are always sequential.
    pub concurrency: usize,

    /// Interface strictness.
    pub strictness: InterfaceStrictness,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8_000,
            concurrency: 4,
            strictness: InterfaceStrictness::Permissive,
        }
    }
}

/// Configuration for a verification run.
///
/// # Example
///
/// ```rust
/// use chainreg_core::{InterfaceStrictness, VerifierConfig};
/// use std::time::Duration;
///
/// let config = VerifierConfig::new()
///     .with_timeout(Duration::from_secs(3))
///     .with_concurrency(2)
///     .with_strictness(InterfaceStrictness::Strict);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.timeout(), Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Probe settings.
    pub probe: ProbeConfig,

    /// Replacement for the built-in role table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RoleSpecEntry>>,
}

impl VerifierConfig {
    /// Default configuration with the built-in role table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-call probe timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.probe.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets how many chains are evaluated at once.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.probe.concurrency = concurrency;
        self
    }

    /// Sets interface strictness.
    #[must_use]
    pub fn with_strictness(mut self, strictness: InterfaceStrictness) -> Self {
        self.probe.strictness = strictness;
        self
    }

    /// Replaces the built-in role table.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<RoleSpecEntry>) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| VerifierError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| VerifierError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Rejects values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.probe.timeout_ms == 0 {
            return Err(VerifierError::Config(
                "probe.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.probe.concurrency == 0 {
            return Err(VerifierError::Config(
                "probe.concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The per-call probe timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.probe.timeout_ms)
    }

    /// The configured role table, or the built-in one.
    ///
    /// # Errors
    ///
    /// A malformed `[[roles]]` table is a setup failure.
    pub fn role_table(&self) -> Result<RoleTable> {
        match &self.roles {
            Some(entries) => Ok(RoleTable::from_entries(entries.clone())?),
            None => Ok(RoleTable::standard()),
        }
    }
}
