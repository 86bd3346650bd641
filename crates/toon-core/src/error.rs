// ============================================
// File: crates/toon-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types specific to token encoding and cryptographic
//! operations in the TOON core crate.
//!
//! ## Error Categories
//! 1. **Crypto Errors**: key generation, key decoding failures
//! 2. **Encoding Errors**: wire delimiter violations
//!
//! Signature *verification* deliberately has no error variant: an
//! invalid signature resolves to `false`, never to an `Err` (an
//! adversarial payload must not be able to select an error path).
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use toon_common::error::CommonError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for token and cryptographic operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Failed to generate or decode a cryptographic key.
    #[error("Key error: {context}")]
    Key {
        /// What key operation failed
        context: String,
    },

    /// A token key or value contains a wire delimiter.
    ///
    /// The TOON wire format has no escaping; emitting such a token would
    /// produce a payload the server parses differently than it was
    /// signed.
    #[error("Token '{key}' contains a reserved wire delimiter")]
    DelimiterViolation {
        /// The offending token key
        key: String,
    },

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `Key` error.
    pub fn key(context: impl Into<String>) -> Self {
        Self::Key {
            context: context.into(),
        }
    }

    /// Creates a `DelimiterViolation` error.
    pub fn delimiter(key: impl Into<String>) -> Self {
        Self::DelimiterViolation { key: key.into() }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::delimiter("HB4");
        assert!(err.to_string().contains("HB4"));

        let err = CoreError::key("invalid Ed25519 seed length");
        assert!(err.to_string().contains("seed"));
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_input("field", "bad value");
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
