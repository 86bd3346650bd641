// ============================================
// File: crates/toon-core/src/lib.rs
// ============================================
//! # TOON Core - Token Protocol & Cryptography Library
//!
//! ## Creation Reason
//! Provides the TOON token wire format and the device cryptographic
//! identity. This crate is the security backbone of the agent: the
//! canonical byte form produced here is the sole input to every
//! signature the device emits or verifies.
//!
//! ## Main Functionality
//!
//! ### Token Module ([`token`])
//! - [`token::TokenMap`]: insertion-ordered token mapping
//! - Wire serialization (`KEY:value|KEY:value`) and lenient parsing
//! - Canonical form (sorted, signature fields excluded) for signing
//! - Array token groups (`PREFIX[idx].FIELD` + `PREFIX_COUNT`)
//! - Typed message builders (registration, heartbeat, acks, ...)
//!
//! ### Crypto Module ([`crypto`])
//! - [`crypto::DeviceKeyPair`]: long-term Ed25519 signing identity
//! - [`crypto::ServerPublicKey`]: out-of-band configured verifier
//! - Keystore persistence (atomic replace, owner-only permissions)
//! - Nonce generation (128-bit hex, one per signed message)
//!
//! ## Security Guarantees
//! - **Authenticity**: Ed25519 signature over the canonical form of
//!   every outbound message; server payloads verified the same way
//! - **Determinism**: equal token mappings canonicalize identically
//!   regardless of insertion order - the property signatures rely on
//! - **Freshness**: a fresh random nonce token per signed message
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses audited RustCrypto/dalek implementations
//! - NEVER implement custom crypto primitives
//! - The canonical form must NEVER include signature-bearing tokens;
//!   the reserved-prefix list in [`token`] is load-bearing
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod token;

pub use crypto::{generate_nonce, sign_tokens, verify_with_public_b64, DeviceKeyPair, ServerPublicKey};
pub use error::{CoreError, Result};
pub use token::{TokenMap, TokenMessage};
