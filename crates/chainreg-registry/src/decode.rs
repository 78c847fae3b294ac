//! # Lenient Descriptor Decoding
//!
//! Registry documents are decoded one chain entry at a time. A field of the
//! wrong type is replaced by a safe default and reported; an entry without a
//! usable key is left out and reported. Either way the remaining entries
//! still load.
//!
//! | Field | Wrong type becomes |
//! |-------|--------------------|
//! | `chainId` | a decimal string is read as the number, anything else `0` |
//! | `name`, `lzId` | absent |
//! | `rpcEndpoints`, `explorerEndpoints` | non-string items dropped, a non-array empty |
//! | `preferredRpcIndex`, `preferredExplorerIndex` | `0` |
//! | `addresses` | a non-object empty; a non-string literal keeps its JSON text, which the reconciler heals to zero |

use crate::integrity::IntegrityIssue;
use crate::models::ChainDescriptor;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

/// Decodes the entry at `position`, recording every repair in `issues`.
///
/// Returns `None` when the entry has no usable key.
pub(crate) fn decode_chain(
    position: usize,
    entry: Value,
    issues: &mut Vec<IntegrityIssue>,
) -> Option<ChainDescriptor> {
    let fields = match entry {
        Value::Object(fields) => fields,
        other => {
            skip(position, format!("expected an object, got {}", kind(&other)), issues);
            return None;
        }
    };

    let key = match fields.get("key") {
        Some(Value::String(key)) if !key.trim().is_empty() => key.clone(),
        Some(Value::String(_)) => {
            skip(position, "empty key".to_string(), issues);
            return None;
        }
        Some(other) => {
            skip(position, format!("key must be a string, got {}", kind(other)), issues);
            return None;
        }
        None => {
            skip(position, "missing key".to_string(), issues);
            return None;
        }
    };

    let mut entry = Entry {
        key: &key,
        fields: &fields,
        issues,
    };
    Some(ChainDescriptor {
        name: entry.name(),
        chain_id: entry.chain_id(),
        lz_id: entry.lz_id(),
        rpc_endpoints: entry.urls("rpcEndpoints"),
        preferred_rpc_index: entry.index("preferredRpcIndex"),
        explorer_endpoints: entry.urls("explorerEndpoints"),
        preferred_explorer_index: entry.index("preferredExplorerIndex"),
        addresses: entry.addresses(),
        key: key.clone(),
    })
}

fn skip(position: usize, reason: String, issues: &mut Vec<IntegrityIssue>) {
    warn!(position, %reason, "Skipping registry entry");
    issues.push(IntegrityIssue::SkippedEntry { position, reason });
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

struct Entry<'a> {
    key: &'a str,
    fields: &'a Map<String, Value>,
    issues: &'a mut Vec<IntegrityIssue>,
}

impl<'a> Entry<'a> {
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field)
    }

    fn heal(&mut self, field: impl Into<String>, detail: String) {
        let field = field.into();
        warn!(chain = self.key, %field, %detail, "Healed registry field");
        self.issues.push(IntegrityIssue::HealedField {
            key: self.key.to_string(),
            field,
            detail,
        });
    }

    fn name(&mut self) -> Option<String> {
        match self.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(other) => {
                self.heal("name", format!("expected a string, got {}", kind(other)));
                None
            }
        }
    }

    fn chain_id(&mut self) -> u64 {
        let Some(value) = self.get("chainId") else {
            return 0;
        };
        if let Some(chain_id) = value.as_u64() {
            return chain_id;
        }
        match value.as_str().and_then(|s| s.trim().parse::<u64>().ok()) {
            Some(chain_id) => {
                self.heal("chainId", format!("read string {} as a number", value));
                chain_id
            }
            None => {
                self.heal("chainId", format!("expected a number, got {}", value));
                0
            }
        }
    }

    fn lz_id(&mut self) -> Option<u32> {
        match self.get("lzId") {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_u64().and_then(|id| u32::try_from(id).ok()) {
                Some(id) => Some(id),
                None => {
                    self.heal("lzId", format!("expected a 32-bit number, got {}", value));
                    None
                }
            },
        }
    }

    fn urls(&mut self, field: &str) -> Vec<String> {
        match self.get(field) {
            None => Vec::new(),
            Some(Value::Array(items)) => {
                let urls: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect();
                let dropped = items.len() - urls.len();
                if dropped > 0 {
                    self.heal(field, format!("dropped {} non-string entries", dropped));
                }
                urls
            }
            Some(other) => {
                self.heal(field, format!("expected an array, got {}", kind(other)));
                Vec::new()
            }
        }
    }

    fn index(&mut self, field: &str) -> usize {
        let Some(value) = self.get(field) else {
            return 0;
        };
        match value.as_u64().and_then(|index| usize::try_from(index).ok()) {
            Some(index) => index,
            None => {
                self.heal(field, format!("expected a non-negative number, got {}", value));
                0
            }
        }
    }

    fn addresses(&mut self) -> IndexMap<String, String> {
        let fields = match self.get("addresses") {
            None => return IndexMap::new(),
            Some(Value::Object(fields)) => fields,
            Some(other) => {
                self.heal("addresses", format!("expected an object, got {}", kind(other)));
                return IndexMap::new();
            }
        };

        let mut addresses = IndexMap::with_capacity(fields.len());
        for (role, literal) in fields {
            let literal = match literal {
                Value::String(literal) => literal.clone(),
                other => {
                    self.heal(
                        format!("addresses.{}", role),
                        format!("expected a string, got {}", kind(other)),
                    );
                    other.to_string()
                }
            };
            addresses.insert(role.clone(), literal);
        }
        addresses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(entry: Value) -> (Option<ChainDescriptor>, Vec<IntegrityIssue>) {
        let mut issues = Vec::new();
        let chain = decode_chain(0, entry, &mut issues);
        (chain, issues)
    }

    #[test]
    fn test_well_formed_entry_matches_serde() {
        let entry = json!({
            "key": "optimism",
            "name": "OP Mainnet",
            "chainId": 10,
            "lzId": 30111,
            "rpcEndpoints": ["https://a", "https://b"],
            "preferredRpcIndex": 1,
            "explorerEndpoints": ["https://scan"],
            "addresses": { "usdc": "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85", "permit2": "0x0" }
        });
        let expected: ChainDescriptor = serde_json::from_value(entry.clone()).unwrap();

        let (chain, issues) = decode(entry);
        assert_eq!(chain, Some(expected));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_null_literal_kept_as_text() {
        let (chain, issues) = decode(json!({"key": "bad", "chainId": 2, "addresses": {"usdc": null}}));
        let chain = chain.unwrap();

        assert_eq!(chain.address("usdc"), Some("null"));
        assert_eq!(
            issues,
            vec![IntegrityIssue::HealedField {
                key: "bad".to_string(),
                field: "addresses.usdc".to_string(),
                detail: "expected a string, got null".to_string(),
            }]
        );
    }

    #[test]
    fn test_string_chain_id() {
        let (chain, issues) = decode(json!({"key": "k", "chainId": "10"}));
        assert_eq!(chain.unwrap().chain_id, 10);
        assert_eq!(issues.len(), 1);

        let (chain, issues) = decode(json!({"key": "k", "chainId": "ten"}));
        assert_eq!(chain.unwrap().chain_id, 0);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_wrong_typed_fields_default() {
        let (chain, issues) = decode(json!({
            "key": "k",
            "chainId": 1,
            "name": 5,
            "lzId": -1,
            "rpcEndpoints": ["https://a", null, 3],
            "preferredRpcIndex": "1",
            "explorerEndpoints": "https://scan",
            "addresses": []
        }));
        let chain = chain.unwrap();

        assert_eq!(chain.name, None);
        assert_eq!(chain.lz_id, None);
        assert_eq!(chain.rpc_endpoints, vec!["https://a".to_string()]);
        assert_eq!(chain.preferred_rpc_index, 0);
        assert!(chain.explorer_endpoints.is_empty());
        assert!(chain.addresses.is_empty());

        let fields: Vec<String> = issues
            .iter()
            .map(|issue| match issue {
                IntegrityIssue::HealedField { field, .. } => field.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            fields,
            ["name", "lzId", "rpcEndpoints", "preferredRpcIndex", "explorerEndpoints", "addresses"]
        );
    }

    #[test]
    fn test_unusable_keys_skipped() {
        for entry in [
            json!({"chainId": 1}),
            json!({"key": "  ", "chainId": 1}),
            json!({"key": 7, "chainId": 1}),
            json!("ethereum"),
        ] {
            let (chain, issues) = decode(entry.clone());
            assert!(chain.is_none(), "{} should be skipped", entry);
            assert!(matches!(issues[..], [IntegrityIssue::SkippedEntry { position: 0, .. }]));
        }
    }
}
