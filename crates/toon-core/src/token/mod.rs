// ============================================
// File: crates/toon-core/src/token/mod.rs
// ============================================
//! # TOON Token Format
//!
//! ## Creation Reason
//! Implements the compact token wire format the device speaks with the
//! server: `KEY:value|KEY:value|...` with short uppercase keys, plus the
//! canonical byte form used as the signing input.
//!
//! ## Main Functionality
//! - [`TokenMap`]: insertion-ordered string token mapping
//! - [`array`]: repeated sub-structures (`PREFIX[idx].FIELD`)
//! - [`messages`]: strongly-typed builders for every outbound message
//!
//! ## Wire Format
//! - Wire form preserves insertion order and includes signature tokens
//! - Canonical form sorts keys ascending, drops signature-reserved keys,
//!   and is the exact byte sequence fed to Ed25519
//! - Values may contain `:` (ISO timestamps do); `|` is reserved and
//!   rejected on serialize since the format has no escaping
//!
//! ## ⚠️ Important Note for Next Developer
//! - [`is_signature_key`] gates what gets signed; adding a new
//!   signature-bearing token family means extending the reserved list
//!   on BOTH ends of the protocol
//!
//! ## Last Modified
//! v0.1.0 - Initial token format implementation

mod array;
mod map;
mod messages;

pub use array::{decode_array, encode_array};
pub use map::TokenMap;
pub use messages::{
    CommandAck, CommandQuery, FirmwareAck, FirmwareCheck, Heartbeat, Registration, TokenMessage,
};

/// Key prefixes whose tokens carry signatures and are therefore excluded
/// from the canonical (signed) form.
pub const SIGNATURE_KEY_PREFIXES: [&str; 3] = ["SIG", "FW_SIG", "SIG_SERV"];

/// Returns `true` if `key` is signature-bearing and must be excluded
/// from canonical form.
#[must_use]
pub fn is_signature_key(key: &str) -> bool {
    SIGNATURE_KEY_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

/// Wire token vocabulary.
///
/// Short uppercase identifiers are the protocol's field names; the
/// constants exist so the rest of the workspace never spells them twice.
pub mod keys {
    /// Device identifier.
    pub const DEVICE_ID: &str = "D1";
    /// Device class tag.
    pub const DEVICE_CLASS: &str = "D2";
    /// Device public key (base64).
    pub const DEVICE_PUBKEY: &str = "D3";
    /// Manufacturer.
    pub const MANUFACTURER: &str = "D4";
    /// Model.
    pub const MODEL: &str = "D5";

    /// Heartbeat id (`hb_<unix-secs>`).
    pub const HB_ID: &str = "HB1";
    /// Uptime in seconds.
    pub const HB_UPTIME: &str = "HB2";
    /// Memory used in MB.
    pub const HB_MEMORY: &str = "HB3";
    /// CPU temperature, one decimal.
    pub const HB_CPU_TEMP: &str = "HB4";
    /// Last boot time, ISO-8601 UTC.
    pub const HB_LAST_BOOT: &str = "HB5";
    /// Network status (`ONLINE`/`OFFLINE`).
    pub const HB_NETWORK: &str = "HB6";

    /// Command id.
    pub const CMD_ID: &str = "CMD1";
    /// Command type tag.
    pub const CMD_TYPE: &str = "CMD2";
    /// Command arguments.
    pub const CMD_ARGS: &str = "CMD3";
    /// Command array group prefix.
    pub const CMD_PREFIX: &str = "CMD";

    /// Acknowledgment status (`OK`/`ERROR`).
    pub const ACK_STATUS: &str = "ACK1";
    /// Acknowledgment message.
    pub const ACK_MESSAGE: &str = "ACK2";
    /// Acknowledgment duration in milliseconds.
    pub const ACK_DURATION: &str = "ACK3";

    /// Firmware manifest id.
    pub const FW_ID: &str = "FW1";
    /// Firmware version (current or target).
    pub const FW_VERSION: &str = "FW2";
    /// Firmware artifact URL.
    pub const FW_URL: &str = "FW3";
    /// Firmware artifact sha256 (hex).
    pub const FW_CHECKSUM: &str = "FW4";
    /// Firmware artifact size in bytes.
    pub const FW_SIZE: &str = "FW5";
    /// Firmware manifest signature.
    pub const FW_SIG: &str = "FW_SIG";

    /// Message timestamp.
    pub const TIMESTAMP: &str = "TS";
    /// Anti-replay nonce.
    pub const NONCE: &str = "NONCE";
    /// Device signature over canonical form.
    pub const DEVICE_SIG: &str = "SIG1";
    /// Server signature over a canonical subset.
    pub const SERVER_SIG: &str = "SIG_SERV";

    /// Response status token.
    pub const STATUS: &str = "S1";
    /// Server-directed retry interval (seconds).
    pub const RETRY_AFTER: &str = "RTO";
    /// Pending command count hint on heartbeat responses.
    pub const PENDING_CMDS: &str = "PENDING_CMDS";
    /// Firmware availability hint on heartbeat responses.
    pub const FW_AVAILABLE: &str = "FW_AVAILABLE";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_key_detection() {
        assert!(is_signature_key("SIG1"));
        assert!(is_signature_key("SIG"));
        assert!(is_signature_key("SIG_SERV"));
        assert!(is_signature_key("FW_SIG"));
        assert!(!is_signature_key("FW1"));
        assert!(!is_signature_key("S1"));
        assert!(!is_signature_key("NONCE"));
    }
}
