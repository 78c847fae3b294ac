//! # Canonical JSON
//!
//! Deterministic JSON serialization (RFC 8785 subset) used to fingerprint
//! registry snapshots. Registry documents only hold strings, integers, arrays
//! and objects, so float formatting is not a concern here.
//!
//! ## Rules
//!
//! 1. **Object keys** sorted by UTF-16 code units
//! 2. **Strings** with minimal escaping
//! 3. **Arrays** keep element order
//! 4. **No insignificant whitespace**
//!
//! ```rust
//! use chainreg_registry::canonicalize::canonicalize;
//! use serde_json::json;
//!
//! let a = canonicalize(&json!({"chainId": 1, "key": "ethereum"}));
//! let b = canonicalize(&json!({"key": "ethereum", "chainId": 1}));
//! assert_eq!(a, b);
//! assert_eq!(a, r#"{"chainId":1,"key":"ethereum"}"#);
//! ```

use serde_json::Value;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Canonical string form of a JSON value.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// SHA-256 of the canonical form.
pub fn hash_canonical(value: &Value) -> Hash {
    Sha256::digest(canonicalize(value).as_bytes()).into()
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonicalize_scalars() {
        assert_eq!(canonicalize(&json!(null)), "null");
        assert_eq!(canonicalize(&json!(true)), "true");
        assert_eq!(canonicalize(&json!(42161)), "42161");
        assert_eq!(canonicalize(&json!("he\"llo\n")), r#""he\"llo\n""#);
    }

    #[test]
    fn test_canonicalize_nested_sorting() {
        let value = json!({
            "z": [3, 2, 1],
            "a": { "y": "1", "b": "2" }
        });
        assert_eq!(canonicalize(&value), r#"{"a":{"b":"2","y":"1"},"z":[3,2,1]}"#);
    }

    #[test]
    fn test_control_characters_escaped() {
        assert_eq!(canonicalize(&json!("\u{0001}")), r#""\u0001""#);
    }

    #[test]
    fn test_hash_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(hash_canonical(&a), hash_canonical(&b));
        assert_ne!(hash_canonical(&a), hash_canonical(&json!({"a": 3, "b": 1})));
    }
}
