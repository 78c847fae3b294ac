//! Verdict types for a single check on a single chain.

use crate::correction::Fix;
use serde::Serialize;
use std::fmt;

/// The classification of one check.
///
/// A verdict always exists; probe failures become `Unresolvable` instead of
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict<T> {
    /// The configured value is confirmed.
    Verified(T),

    /// The configured value should be replaced.
    NeedsCorrection {
        /// Proposed value.
        value: T,
        /// Why.
        reason: CorrectionReason,
    },

    /// Not enough evidence either way.
    Unresolvable(String),
}

impl<T> Verdict<T> {
    /// Create a NeedsCorrection verdict.
    pub fn correct(value: T, reason: CorrectionReason) -> Self {
        Self::NeedsCorrection { value, reason }
    }

    /// Create an Unresolvable verdict.
    pub fn unresolvable(reason: impl Into<String>) -> Self {
        Self::Unresolvable(reason.into())
    }

    /// Returns true if this is a Verified verdict.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Returns true if a correction is proposed.
    pub fn needs_correction(&self) -> bool {
        matches!(self, Self::NeedsCorrection { .. })
    }

    /// Returns true if this is an Unresolvable verdict.
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Self::Unresolvable(_))
    }
}

impl<T: Clone> Verdict<T> {
    /// The proposed correction, if any.
    pub fn fix(&self) -> Option<Fix<T>> {
        match self {
            Self::NeedsCorrection { value, reason } => Some(Fix::new(value.clone(), *reason)),
            Self::Verified(_) | Self::Unresolvable(_) => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Verdict<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified(value) => write!(f, "verified ({})", value),
            Self::NeedsCorrection { value, reason } => {
                write!(f, "needs correction -> {} ({})", value, reason)
            }
            Self::Unresolvable(reason) => write!(f, "unresolvable ({})", reason),
        }
    }
}

/// Why a field is being changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CorrectionReason {
    /// An earlier endpoint in preference order reports the configured chain id.
    PreferredEndpoint,

    /// No endpoint reports the configured chain id; the first reachable one
    /// is trusted.
    ChainIdMismatch,

    /// Literal differs from its EIP-55 form.
    ChecksumMismatch,

    /// Zero or missing role, and the default address has bytecode.
    FoundBytecodeAtDefault,

    /// No bytecode at the configured address, but the default has some.
    ReplacedWithDefault,

    /// No bytecode at the configured address or at the default.
    NoBytecode,

    /// Unparseable address literal.
    InvalidAddress,

    /// Preferred index does not point into its list.
    IndexOutOfRange,

    /// Role from the role table absent from the descriptor.
    MissingRole,
}

impl fmt::Display for CorrectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PreferredEndpoint => "first endpoint reporting the configured chainId",
            Self::ChainIdMismatch => "live network reports a different chainId",
            Self::ChecksumMismatch => "checksum mismatch",
            Self::FoundBytecodeAtDefault => "found bytecode at default",
            Self::ReplacedWithDefault => "no bytecode at configured address, found bytecode at default",
            Self::NoBytecode => "no bytecode at configured address or default",
            Self::InvalidAddress => "invalid address literal",
            Self::IndexOutOfRange => "index out of range",
            Self::MissingRole => "added missing role",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_verified() {
        let verdict: Verdict<u64> = Verdict::Verified(1);
        assert!(verdict.is_verified());
        assert!(!verdict.needs_correction());
        assert!(verdict.fix().is_none());
    }

    #[test]
    fn test_verdict_correction() {
        let verdict = Verdict::correct(2usize, CorrectionReason::PreferredEndpoint);
        assert!(verdict.needs_correction());
        assert_eq!(
            verdict.fix(),
            Some(Fix::new(2, CorrectionReason::PreferredEndpoint))
        );
    }

    #[test]
    fn test_verdict_unresolvable() {
        let verdict: Verdict<u64> = Verdict::unresolvable("no reachable rpc endpoint");
        assert!(verdict.is_unresolvable());
        assert!(verdict.fix().is_none());
        assert_eq!(verdict.to_string(), "unresolvable (no reachable rpc endpoint)");
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            CorrectionReason::FoundBytecodeAtDefault.to_string(),
            "found bytecode at default"
        );
        assert_eq!(CorrectionReason::MissingRole.to_string(), "added missing role");
        assert_eq!(CorrectionReason::ChecksumMismatch.to_string(), "checksum mismatch");
    }
}
