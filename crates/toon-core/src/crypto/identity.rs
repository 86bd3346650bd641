// ============================================
// File: crates/toon-core/src/crypto/identity.rs
// ============================================
//! # Device Identity Keys
//!
//! ## Creation Reason
//! Defines the device's long-term Ed25519 signing identity and the
//! out-of-band configured server verification key, with the security
//! properties the protocol depends on (redacted Debug, zeroized seed
//! copies, infallible verification).
//!
//! ## Main Functionality
//! - `DeviceKeyPair`: long-term Ed25519 signing keys
//! - `ServerPublicKey`: verifier for `SIG_SERV`/`FW_SIG` tokens
//! - `verify_with_public_b64`: one-shot verification, never raises
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  DeviceKeyPair (Long-term)                                 │
//! │  ├─ Generated once at first run, persisted immediately     │
//! │  ├─ Reloaded on every restart - NEVER regenerated, or the  │
//! │  │  server rejects all subsequent signatures               │
//! │  └─ Signs the canonical form of every outbound message     │
//! │                                                            │
//! │  ServerPublicKey (Configured)                              │
//! │  ├─ Delivered out of band (config file)                    │
//! │  └─ Absent => no command or manifest can ever verify       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Private keys must NEVER be logged or appear in Debug output
//! - Verification failure is a `false`, not an error: adversarial
//!   payloads must not get to pick an error path
//!
//! ## Last Modified
//! v0.1.0 - Initial identity key types

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use super::{ED25519_PUBLIC_KEY_SIZE, ED25519_SIGNATURE_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// DeviceKeyPair
// ============================================

/// Long-term Ed25519 identity key pair for message signing.
///
/// # Security
/// - Generated with the OS random number generator
/// - The signing key zeroizes its material on drop (dalek internal)
/// - Debug output never includes private material
///
/// # Example
/// ```
/// use toon_core::DeviceKeyPair;
///
/// let identity = DeviceKeyPair::generate();
/// let sig = identity.sign_b64(b"canonical bytes");
/// assert!(toon_core::crypto::verify_with_public_b64(
///     &identity.public_key_b64(),
///     b"canonical bytes",
///     &sig,
/// ));
/// ```
pub struct DeviceKeyPair {
    signing_key: SigningKey,
}

impl DeviceKeyPair {
    /// Generates a new random identity key pair.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Restores an identity from a 32-byte Ed25519 seed.
    ///
    /// # Errors
    /// Returns an error if `bytes` is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(CoreError::key(format!(
                "invalid Ed25519 seed size: expected 32, got {}",
                bytes.len()
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(bytes);
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Ok(Self { signing_key })
    }

    /// Restores an identity from a base64-encoded seed.
    ///
    /// # Errors
    /// Returns an error on invalid base64 or wrong seed length.
    pub fn from_base64(seed_b64: &str) -> Result<Self> {
        let mut bytes = BASE64
            .decode(seed_b64)
            .map_err(|_| CoreError::key("invalid base64 private key"))?;
        let keypair = Self::from_bytes(&bytes);
        bytes.zeroize();
        keypair
    }

    /// Exports the private seed bytes for secure storage.
    ///
    /// # Security Warning
    /// Handle with care; the caller owns zeroizing any copies it makes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Private seed, base64-encoded, for the key file.
    #[must_use]
    pub fn private_key_b64(&self) -> String {
        let mut seed = self.to_bytes();
        let encoded = BASE64.encode(seed);
        seed.zeroize();
        encoded
    }

    /// Raw public key bytes.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; ED25519_PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Public key in the wire encoding (base64), as carried by the
    /// registration `D3` token.
    #[must_use]
    pub fn public_key_b64(&self) -> String {
        BASE64.encode(self.public_key_bytes())
    }

    /// Signs a message, returning the wire encoding (base64) of the
    /// 64-byte Ed25519 signature.
    #[must_use]
    pub fn sign_b64(&self, message: &[u8]) -> String {
        let signature = self.signing_key.sign(message);
        BASE64.encode(signature.to_bytes())
    }
}

impl fmt::Debug for DeviceKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        f.debug_struct("DeviceKeyPair")
            .field("public_key", &self.public_key_b64())
            .finish_non_exhaustive()
    }
}

// ============================================
// ServerPublicKey
// ============================================

/// The server's Ed25519 verification key, configured out of band.
///
/// Used to verify `SIG_SERV` on commands and `FW_SIG` on firmware
/// manifests. When no server key is configured, such payloads are
/// rejected by policy - never accepted unverified.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ServerPublicKey(VerifyingKey);

impl ServerPublicKey {
    /// Parses a base64-encoded 32-byte Ed25519 public key.
    ///
    /// # Errors
    /// Returns an error on invalid base64, wrong length, or a byte
    /// string that is not a valid curve point.
    pub fn from_base64(public_b64: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(public_b64)
            .map_err(|_| CoreError::key("invalid base64 server public key"))?;
        if bytes.len() != ED25519_PUBLIC_KEY_SIZE {
            return Err(CoreError::key(format!(
                "invalid server public key size: expected {ED25519_PUBLIC_KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; ED25519_PUBLIC_KEY_SIZE];
        arr.copy_from_slice(&bytes);
        let key = VerifyingKey::from_bytes(&arr)
            .map_err(|_| CoreError::key("invalid Ed25519 server public key"))?;
        Ok(Self(key))
    }

    /// Verifies a base64-encoded signature over `message`.
    ///
    /// Never raises: a malformed signature string or a mismatch both
    /// resolve to `false`.
    #[must_use]
    pub fn verify_b64(&self, message: &[u8], signature_b64: &str) -> bool {
        let Ok(sig_bytes) = BASE64.decode(signature_b64) else {
            return false;
        };
        let Ok(sig_arr) = <[u8; ED25519_SIGNATURE_SIZE]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_arr);
        self.0.verify(message, &signature).is_ok()
    }
}

impl fmt::Debug for ServerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.as_bytes();
        write!(
            f,
            "ServerPublicKey({:02x}{:02x}{:02x}{:02x}...)",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }
}

// ============================================
// One-shot verification
// ============================================

/// Verifies `signature_b64` over `message` against a base64-encoded
/// public key.
///
/// Never raises - an invalid key, malformed signature text, or signature
/// mismatch all resolve to `false`.
#[must_use]
pub fn verify_with_public_b64(public_b64: &str, message: &[u8], signature_b64: &str) -> bool {
    match ServerPublicKey::from_base64(public_b64) {
        Ok(key) => key.verify_b64(message, signature_b64),
        Err(_) => false,
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp1 = DeviceKeyPair::generate();
        let kp2 = DeviceKeyPair::generate();
        assert_ne!(kp1.public_key_bytes(), kp2.public_key_bytes());
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let kp = DeviceKeyPair::generate();
        let message = b"D1:dev|TS:2026-08-06T12:00:00.000Z";
        let sig = kp.sign_b64(message);
        assert!(verify_with_public_b64(&kp.public_key_b64(), message, &sig));
    }

    #[test]
    fn test_verify_rejects_mutations() {
        let kp = DeviceKeyPair::generate();
        let message = b"D1:dev|HB2:86400";
        let sig = kp.sign_b64(message);
        let public = kp.public_key_b64();

        // Mutated message.
        assert!(!verify_with_public_b64(&public, b"D1:dev|HB2:86401", &sig));

        // Mutated signature (flip one byte, re-encode).
        let mut sig_bytes = BASE64.decode(&sig).unwrap();
        sig_bytes[0] ^= 0x01;
        let bad_sig = BASE64.encode(&sig_bytes);
        assert!(!verify_with_public_b64(&public, message, &bad_sig));

        // Mutated public key.
        let mut pub_bytes = BASE64.decode(&public).unwrap();
        pub_bytes[0] ^= 0x01;
        let bad_pub = BASE64.encode(&pub_bytes);
        assert!(!verify_with_public_b64(&bad_pub, message, &sig));
    }

    #[test]
    fn test_verify_never_raises() {
        let kp = DeviceKeyPair::generate();
        let public = kp.public_key_b64();

        // Garbage base64, wrong lengths, empty strings.
        assert!(!verify_with_public_b64("not base64!!!", b"m", "sig"));
        assert!(!verify_with_public_b64(&public, b"m", "not base64!!!"));
        assert!(!verify_with_public_b64(&public, b"m", ""));
        assert!(!verify_with_public_b64("", b"m", ""));
        assert!(!verify_with_public_b64(
            &BASE64.encode([0u8; 5]),
            b"m",
            &BASE64.encode([0u8; 5])
        ));
    }

    #[test]
    fn test_seed_roundtrip() {
        let kp = DeviceKeyPair::generate();
        let restored = DeviceKeyPair::from_base64(&kp.private_key_b64()).unwrap();
        assert_eq!(kp.public_key_bytes(), restored.public_key_bytes());
    }

    #[test]
    fn test_from_bytes_rejects_bad_length() {
        assert!(DeviceKeyPair::from_bytes(&[0u8; 16]).is_err());
        assert!(DeviceKeyPair::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let kp = DeviceKeyPair::generate();
        let debug = format!("{kp:?}");
        assert!(!debug.contains(&kp.private_key_b64()));
        assert!(debug.contains("public_key"));
    }
}
