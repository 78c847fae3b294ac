//! Error types for chainreg-core.
//!
//! Only setup failures are errors. Probe failures are folded into verdicts
//! and never surface here.

use chainreg_probe::NetworkError;
use chainreg_registry::RegistryError;
use thiserror::Error;

/// Setup failure that aborts a verification run.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Registry unreadable, malformed, or an invalid role table.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Invalid or unreadable run configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The network client could not be built.
    #[error("Client setup failed: {0}")]
    Client(#[from] NetworkError),
}
