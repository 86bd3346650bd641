// ============================================
// File: crates/toon-core/src/token/map.rs
// ============================================
//! # Token Mapping
//!
//! ## Creation Reason
//! The protocol's basic message unit: an ordered mapping from short
//! uppercase keys to opaque string values, with two byte encodings that
//! must never be confused - the wire form (insertion order, includes
//! signatures) and the canonical form (sorted, signatures excluded,
//! signing input).
//!
//! ## Parsing Strategy
//! Decode is lenient by protocol contract: parts without a `:` are
//! skipped, the first `:` splits key from value (values may themselves
//! contain `:`). Encode is strict: the format has no escaping, so a `|`
//! anywhere, or a `:` inside a key, is a hard error.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Canonical determinism is load-bearing: equal mappings MUST
//!   canonicalize to identical bytes or signatures break
//! - Insert keeps the first-insertion position on replace, matching the
//!   server's dictionary semantics
//!
//! ## Last Modified
//! v0.1.0 - Initial token map implementation

use crate::error::{CoreError, Result};
use crate::token::is_signature_key;

// ============================================
// TokenMap
// ============================================

/// Insertion-ordered token mapping.
///
/// # Example
/// ```
/// use toon_core::TokenMap;
///
/// let mut tokens = TokenMap::new();
/// tokens.insert("D1", "device-01");
/// tokens.insert("TS", "2026-08-06T12:00:00.000Z");
/// tokens.insert("SIG1", "c2ln");
///
/// // Canonical form excludes the signature token and sorts keys.
/// assert_eq!(tokens.canonical_string(), "D1:device-01|TS:2026-08-06T12:00:00.000Z");
///
/// // Wire form keeps everything in insertion order.
/// let wire = tokens.to_wire().unwrap();
/// assert_eq!(wire, "D1:device-01|TS:2026-08-06T12:00:00.000Z|SIG1:c2ln");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenMap {
    entries: Vec<(String, String)>,
}

impl TokenMap {
    /// Creates an empty token mapping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a token, replacing the value in place if the key exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Inserts a token if the value is present; absent values are
    /// dropped entirely (they never reach wire or canonical form).
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Looks up a token value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up a token value and parses it as an unsigned integer.
    ///
    /// Missing or non-numeric values resolve to `None`; an adversarial
    /// response must not be able to produce a parse panic.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the mapping holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates tokens in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // ========================================
    // Canonical Form
    // ========================================

    /// Produces the canonical string: keys sorted ascending, signature
    /// tokens excluded, joined as `key:value` with `|`.
    ///
    /// This is deterministic over insertion order; it is the exact byte
    /// sequence covered by message signatures.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let mut keys: Vec<&str> = self
            .entries
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| !is_signature_key(k))
            .collect();
        keys.sort_unstable();

        let mut out = String::new();
        for key in keys {
            if !out.is_empty() {
                out.push('|');
            }
            out.push_str(key);
            out.push(':');
            // get() is safe: key came from entries.
            out.push_str(self.get(key).unwrap_or_default());
        }
        out
    }

    /// Canonical form as bytes (the signing input).
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.canonical_string().into_bytes()
    }

    // ========================================
    // Wire Form
    // ========================================

    /// Serializes to the wire form: all tokens (signatures included) in
    /// insertion order, `key:value` joined with `|`.
    ///
    /// # Errors
    /// Returns [`CoreError::DelimiterViolation`] if any key contains `|`
    /// or `:`, or any value contains `|`. The format has no escaping;
    /// emitting such a payload would be parsed differently than it was
    /// signed.
    pub fn to_wire(&self) -> Result<String> {
        let mut out = String::new();
        for (key, value) in &self.entries {
            if key.contains('|') || key.contains(':') || value.contains('|') {
                return Err(CoreError::delimiter(key.clone()));
            }
            if !out.is_empty() {
                out.push('|');
            }
            out.push_str(key);
            out.push(':');
            out.push_str(value);
        }
        Ok(out)
    }

    /// Parses a wire payload into a token mapping.
    ///
    /// Lenient by contract: empty input yields an empty mapping, parts
    /// without a `:` are skipped, the first `:` splits key from value.
    #[must_use]
    pub fn parse(payload: &str) -> Self {
        let mut out = Self::new();
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return out;
        }
        for part in trimmed.split('|') {
            let Some((key, value)) = part.split_once(':') else {
                continue;
            };
            out.insert(key, value);
        }
        out
    }
}

// Order-insensitive equality: the mapping is a dictionary on the wire;
// two payloads carrying the same tokens are the same message.
impl PartialEq for TokenMap {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.get(k) == Some(v.as_str()))
    }
}

impl Eq for TokenMap {}

// ============================================
// Tests
// ============================================
