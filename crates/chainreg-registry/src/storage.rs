//! # Registry File Store
//!
//! JSON source and sink for registry documents. The verification core only
//! sees [`Registry`] values; this module is the thin I/O wrapper around them.
//!
//! Writes go to a sibling temporary file first and are renamed into place, so
//! an interrupted run never leaves a half-written registry behind.

use crate::models::{RegistryError, Result};
use crate::registry::Registry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A registry document on disk.
#[derive(Debug, Clone)]
pub struct RegistryFile {
    path: PathBuf,
}

impl RegistryFile {
    /// Refers to a registry file; nothing is read until [`load`](Self::load).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the registry.
    ///
    /// # Errors
    ///
    /// Any failure here is a setup failure: the file is unreadable or the
    /// document is malformed.
    pub fn load(&self) -> Result<Registry> {
        let json = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let registry = Registry::from_json(&json)?;
        info!(
            path = %self.path.display(),
            chains = registry.len(),
            fingerprint = %registry.fingerprint()?,
            "Loaded registry"
        );
        Ok(registry)
    }

    /// Atomically replaces the file with `registry`.
    pub fn write(&self, registry: &Registry) -> Result<()> {
        let mut json = registry.to_json_pretty()?;
        json.push('\n');

        let tmp = self.tmp_path();
        debug!(tmp = %tmp.display(), "Writing registry");
        fs::write(&tmp, json).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;

        info!(
            path = %self.path.display(),
            fingerprint = %registry.fingerprint()?,
            "Wrote registry"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChainDescriptor;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let file = RegistryFile::new(dir.path().join("chains.json"));
        let registry = Registry::new(vec![ChainDescriptor::new("ethereum", 1)
            .with_rpc("https://eth.example")
            .with_address("permit2", "0x000000000022D473030F116dDEE9F6B43aC78BA3")]);

        file.write(&registry).unwrap();
        assert_eq!(file.load().unwrap(), registry);
        assert!(!dir.path().join("chains.json.tmp").exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let file = RegistryFile::new(dir.path().join("absent.json"));
        assert!(matches!(file.load(), Err(RegistryError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            RegistryFile::new(&path).load(),
            Err(RegistryError::Serialization(_))
        ));
    }
}
