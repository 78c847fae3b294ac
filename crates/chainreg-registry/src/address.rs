//! # Address Normalization
//!
//! Deterministic canonical casing of hex addresses (EIP-55) and classification
//! of configured literals.
//!
//! A registry stores addresses as they were typed. Before any probe the
//! literal is parsed and compared against its checksummed form; a difference is
//! a correction in its own right, independent of what the network says.
//!
//! ## Rules
//!
//! | Literal | Classification |
//! |---------|----------------|
//! | `0x` + 40 zero digits | [`AddressLiteral::Zero`] |
//! | `0x` + 40 hex digits, EIP-55 cased | [`AddressLiteral::Canonical`] |
//! | `0x` + 40 hex digits, other casing | [`AddressLiteral::NonCanonical`] |
//! | anything else (`0x0`, missing prefix, wrong length) | [`AddressLiteral::Invalid`] |
//!
//! ## References
//!
//! - EIP-55: <https://eips.ethereum.org/EIPS/eip-55>

use alloy_primitives::Address;

/// The zero address literal, used as the "not deployed / unknown" marker.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Length of a `0x`-prefixed 20-byte address literal.
const LITERAL_LEN: usize = 42;

/// Classification of a configured address literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressLiteral {
    /// The zero address.
    Zero,

    /// A non-zero address already in checksummed form.
    Canonical(Address),

    /// A valid non-zero address whose literal differs from its checksummed form.
    NonCanonical {
        /// Parsed address.
        address: Address,
        /// The checksummed literal it should be rewritten to.
        canonical: String,
    },

    /// Not a parseable address literal.
    Invalid(String),
}

impl AddressLiteral {
    /// The parsed non-zero address, if any.
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Canonical(address) | Self::NonCanonical { address, .. } => Some(*address),
            Self::Zero | Self::Invalid(_) => None,
        }
    }

    /// Whether the literal denotes the zero marker.
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Zero)
    }
}

/// Classifies a configured literal.
///
/// # Example
///
/// ```rust
/// use chainreg_registry::address::classify;
/// use chainreg_registry::AddressLiteral;
///
/// let literal = "0xca11bde05977b3631167028862be2a173976ca11";
/// match classify(literal) {
///     AddressLiteral::NonCanonical { canonical, .. } => {
///         assert_eq!(canonical, "0xcA11bde05977b3631167028862bE2a173976CA11");
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn classify(literal: &str) -> AddressLiteral {
    let Some(address) = parse(literal) else {
        return AddressLiteral::Invalid(literal.to_string());
    };

    if address == Address::ZERO {
        return AddressLiteral::Zero;
    }

    let canonical = checksum(&address);
    if canonical == literal {
        AddressLiteral::Canonical(address)
    } else {
        AddressLiteral::NonCanonical { address, canonical }
    }
}

/// Parses a `0x`-prefixed, 40-hex-digit literal regardless of casing.
pub fn parse(literal: &str) -> Option<Address> {
    let digits = literal.strip_prefix("0x")?;
    if literal.len() != LITERAL_LEN || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    literal.parse().ok()
}

/// EIP-55 checksummed literal of an address.
///
/// The zero address has no letters, so its checksummed form equals
/// [`ZERO_ADDRESS`].
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Canonical literal for a valid address literal, `None` when invalid.
///
/// Normalization is idempotent: normalizing a normalized literal returns it
/// unchanged.
pub fn normalize(literal: &str) -> Option<String> {
    parse(literal).map(|address| checksum(&address))
}
