// ============================================
// File: crates/toon-core/src/token/array.rs
// ============================================
//! # Array Token Groups
//!
//! ## Creation Reason
//! The flat token format has no nesting; repeated sub-structures
//! (command lists) are encoded as `PREFIX[idx].FIELD` tokens plus a
//! trailing `PREFIX_COUNT` scalar.
//!
//! ## Decoding Contract
//! Indices are grouped and returned in ascending order. Gaps are NOT
//! filled: a sparse sequence silently compacts. The server may rely on
//! this leniency; receivers that care about positions must carry an
//! explicit id field per element instead.
//!
//! ## Last Modified
//! v0.1.0 - Initial array group codec

use std::collections::BTreeMap;

use crate::token::TokenMap;

/// Splits an array-group key `PREFIX[idx].FIELD` into its parts.
///
/// Returns `None` for keys that do not match the shape.
fn split_array_key(key: &str) -> Option<(&str, usize, &str)> {
    let open = key.find('[')?;
    let rest = &key[open + 1..];
    let close = rest.find("].")?;
    let idx: usize = rest[..close].parse().ok()?;
    let field = &rest[close + 2..];
    if open == 0 || field.is_empty() {
        return None;
    }
    Some((&key[..open], idx, field))
}

/// Decodes an array token group into an ordered sequence of
/// field-mappings.
///
/// Scans every key of shape `PREFIX[idx].FIELD`, groups by `idx`, and
/// returns the groups in ascending index order. Sparse indices compact;
/// the `PREFIX_COUNT` scalar, if present, is informational only.
#[must_use]
pub fn decode_array(tokens: &TokenMap, prefix: &str) -> Vec<TokenMap> {
    let mut buckets: BTreeMap<usize, TokenMap> = BTreeMap::new();
    for (key, value) in tokens.iter() {
        let Some((p, idx, field)) = split_array_key(key) else {
            continue;
        };
        if p != prefix {
            continue;
        }
        buckets.entry(idx).or_default().insert(field, value);
    }
    buckets.into_values().collect()
}

/// Encodes an ordered sequence of field-mappings as an array token
/// group: `PREFIX[idx].FIELD` per field plus a `PREFIX_COUNT` scalar.
#[must_use]
pub fn encode_array(items: &[TokenMap], prefix: &str) -> TokenMap {
    let mut out = TokenMap::new();
    for (idx, item) in items.iter().enumerate() {
        for (field, value) in item.iter() {
            out.insert(format!("{prefix}[{idx}].{field}"), value);
        }
    }
    out.insert(format!("{prefix}_COUNT"), items.len().to_string());
    out
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(id: &str, kind: &str) -> TokenMap {
        let mut t = TokenMap::new();
        t.insert("CMD1", id);
        t.insert("CMD2", kind);
        t
    }

    #[test]
    fn test_array_roundtrip() {
        let items = vec![cmd("c-1", "RESTART"), cmd("c-2", "FETCH_LOGS")];
        let encoded = encode_array(&items, "CMD");

        assert_eq!(encoded.get("CMD_COUNT"), Some("2"));
        assert_eq!(encoded.get("CMD[0].CMD1"), Some("c-1"));
        assert_eq!(encoded.get("CMD[1].CMD2"), Some("FETCH_LOGS"));

        let decoded = decode_array(&encoded, "CMD");
        assert_eq!(decoded, items);
    }

    #[test]
    fn test_empty_sequence() {
        let encoded = encode_array(&[], "CMD");
        assert_eq!(encoded.get("CMD_COUNT"), Some("0"));
        assert!(decode_array(&encoded, "CMD").is_empty());
    }

    #[test]
    fn test_sparse_indices_compact() {
        // Holes in the index space compact silently; ordering by index
        // is preserved.
        let mut tokens = TokenMap::new();
        tokens.insert("CMD[4].CMD1", "late");
        tokens.insert("CMD[0].CMD1", "early");
        tokens.insert("CMD_COUNT", "5");

        let decoded = decode_array(&tokens, "CMD");
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].get("CMD1"), Some("early"));
        assert_eq!(decoded[1].get("CMD1"), Some("late"));
    }

    #[test]
    fn test_prefix_isolation() {
        let mut tokens = TokenMap::new();
        tokens.insert("CMD[0].CMD1", "cmd");
        tokens.insert("EVT[0].CMD1", "evt");

        let decoded = decode_array(&tokens, "CMD");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].get("CMD1"), Some("cmd"));
    }

    #[test]
    fn test_malformed_keys_skipped() {
        let mut tokens = TokenMap::new();
        tokens.insert("CMD[x].CMD1", "bad index");
        tokens.insert("CMD[0]CMD1", "missing dot");
        tokens.insert("CMD[0].", "empty field");
        tokens.insert("[0].CMD1", "empty prefix");
        assert!(decode_array(&tokens, "CMD").is_empty());
    }
}
