// ============================================
// File: crates/toon-core/src/token/messages.rs
// ============================================
//! # Typed Message Builders
//!
//! ## Creation Reason
//! Outbound messages used to be assembled as ad-hoc dictionaries, which
//! made missing-field and extra-field drift invisible until the server
//! rejected a signature. Each message type is a struct here; one
//! generic routine turns its ordered field list into tokens, and the
//! same canonicalization path signs every one of them.
//!
//! ## Main Functionality
//! - One builder struct per outbound message: [`Registration`],
//!   [`Heartbeat`], [`CommandQuery`], [`CommandAck`], [`FirmwareCheck`],
//!   [`FirmwareAck`]
//! - [`TokenMessage`]: the shared build interface, also naming the
//!   message kind for audit records
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field emission order here IS the wire order; the canonical form is
//!   order-independent, but keep wire order stable for the benefit of
//!   humans reading audit logs
//! - Numeric formatting (one-decimal temperature) is part of the signed
//!   bytes; change it and the server sees a different message
//!
//! ## Last Modified
//! v0.1.0 - Initial typed builders

use crate::token::{keys, TokenMap};

/// Acknowledgment status token for a successful outcome.
pub const ACK_OK: &str = "OK";
/// Acknowledgment status token for a failed outcome.
pub const ACK_ERROR: &str = "ERROR";

/// A strongly-typed outbound protocol message.
pub trait TokenMessage {
    /// Short kind tag, used for audit records.
    fn kind(&self) -> &'static str;

    /// Emits the message's ordered token list (unsigned).
    fn tokens(&self) -> TokenMap;
}

// ============================================
// Registration
// ============================================

/// Device registration request.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Device identifier.
    pub device_id: String,
    /// Device class tag.
    pub device_class: String,
    /// Device public key, base64.
    pub public_key_b64: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Wire timestamp.
    pub timestamp: String,
    /// Anti-replay nonce.
    pub nonce: String,
}

impl TokenMessage for Registration {
    fn kind(&self) -> &'static str {
        "register"
    }

    fn tokens(&self) -> TokenMap {
        let mut t = TokenMap::new();
        t.insert(keys::DEVICE_ID, self.device_id.as_str());
        t.insert(keys::DEVICE_CLASS, self.device_class.as_str());
        t.insert(keys::DEVICE_PUBKEY, self.public_key_b64.as_str());
        t.insert(keys::MANUFACTURER, self.manufacturer.as_str());
        t.insert(keys::MODEL, self.model.as_str());
        t.insert(keys::TIMESTAMP, self.timestamp.as_str());
        t.insert(keys::NONCE, self.nonce.as_str());
        t
    }
}

// ============================================
// Heartbeat
// ============================================

/// Periodic health report.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    /// Device identifier.
    pub device_id: String,
    /// Heartbeat id (`hb_<unix-secs>`).
    pub heartbeat_id: String,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// Memory used in MB.
    pub memory_mb: u64,
    /// CPU temperature in °C; emitted with one decimal.
    pub cpu_temp_c: f64,
    /// Last boot time, ISO-8601 UTC.
    pub last_boot: String,
    /// Network status (`ONLINE`/`OFFLINE`).
    pub network: String,
    /// Currently running firmware version.
    pub firmware: String,
    /// Wire timestamp.
    pub timestamp: String,
    /// Anti-replay nonce.
    pub nonce: String,
}

impl TokenMessage for Heartbeat {
    fn kind(&self) -> &'static str {
        "heartbeat"
    }

    fn tokens(&self) -> TokenMap {
        let mut t = TokenMap::new();
        t.insert(keys::DEVICE_ID, self.device_id.as_str());
        t.insert(keys::HB_ID, self.heartbeat_id.as_str());
        t.insert(keys::HB_UPTIME, self.uptime_secs.to_string());
        t.insert(keys::HB_MEMORY, self.memory_mb.to_string());
        t.insert(keys::HB_CPU_TEMP, format!("{:.1}", self.cpu_temp_c));
        t.insert(keys::HB_LAST_BOOT, self.last_boot.as_str());
        t.insert(keys::HB_NETWORK, self.network.as_str());
        t.insert(keys::FW_VERSION, self.firmware.as_str());
        t.insert(keys::TIMESTAMP, self.timestamp.as_str());
        t.insert(keys::NONCE, self.nonce.as_str());
        t
    }
}

// ============================================
// CommandQuery
// ============================================

/// Signed command-poll query (sent as a read).
#[derive(Debug, Clone)]
pub struct CommandQuery {
    /// Device identifier.
    pub device_id: String,
    /// Wire timestamp.
    pub timestamp: String,
    /// Anti-replay nonce.
    pub nonce: String,
}

impl TokenMessage for CommandQuery {
    fn kind(&self) -> &'static str {
        "commands_poll"
    }

    fn tokens(&self) -> TokenMap {
        let mut t = TokenMap::new();
        t.insert(keys::DEVICE_ID, self.device_id.as_str());
        t.insert(keys::TIMESTAMP, self.timestamp.as_str());
        t.insert(keys::NONCE, self.nonce.as_str());
        t
    }
}

// ============================================
// CommandAck
// ============================================

/// Acknowledgment for a handled command.
#[derive(Debug, Clone)]
pub struct CommandAck {
    /// Device identifier.
    pub device_id: String,
    /// Id of the command being acknowledged.
    pub command_id: String,
    /// Outcome of the command.
    pub ok: bool,
    /// Human-readable outcome message.
    pub message: String,
    /// Handling duration in milliseconds.
    pub duration_ms: u64,
    /// Wire timestamp.
    pub timestamp: String,
    /// Anti-replay nonce.
    pub nonce: String,
}

impl TokenMessage for CommandAck {
    fn kind(&self) -> &'static str {
        "command_ack"
    }

    fn tokens(&self) -> TokenMap {
        let mut t = TokenMap::new();
        t.insert(keys::DEVICE_ID, self.device_id.as_str());
        t.insert(keys::CMD_ID, self.command_id.as_str());
        t.insert(keys::ACK_STATUS, if self.ok { ACK_OK } else { ACK_ERROR });
        t.insert(keys::ACK_MESSAGE, self.message.as_str());
        t.insert(keys::ACK_DURATION, self.duration_ms.to_string());
        t.insert(keys::TIMESTAMP, self.timestamp.as_str());
        t.insert(keys::NONCE, self.nonce.as_str());
        t
    }
}

// ============================================
// FirmwareCheck
// ============================================

/// Firmware availability query carrying the current version.
#[derive(Debug, Clone)]
pub struct FirmwareCheck {
    /// Device identifier.
    pub device_id: String,
    /// Currently running firmware version.
    pub firmware: String,
    /// Wire timestamp.
    pub timestamp: String,
    /// Anti-replay nonce.
    pub nonce: String,
}

impl TokenMessage for FirmwareCheck {
    fn kind(&self) -> &'static str {
        "fw_check"
    }

    fn tokens(&self) -> TokenMap {
        let mut t = TokenMap::new();
        t.insert(keys::DEVICE_ID, self.device_id.as_str());
        t.insert(keys::FW_VERSION, self.firmware.as_str());
        t.insert(keys::TIMESTAMP, self.timestamp.as_str());
        t.insert(keys::NONCE, self.nonce.as_str());
        t
    }
}

// ============================================
// FirmwareAck
// ============================================

/// Acknowledgment for a firmware update attempt, success or failure.
#[derive(Debug, Clone)]
pub struct FirmwareAck {
    /// Device identifier.
    pub device_id: String,
    /// Manifest id of the attempted update.
    pub manifest_id: String,
    /// Target firmware version from the manifest.
    pub version: String,
    /// Whether the apply stage succeeded.
    pub ok: bool,
    /// Human-readable outcome message.
    pub message: String,
    /// Wire timestamp.
    pub timestamp: String,
    /// Anti-replay nonce.
    pub nonce: String,
}

impl TokenMessage for FirmwareAck {
    fn kind(&self) -> &'static str {
        "fw_ack"
    }

    fn tokens(&self) -> TokenMap {
        let mut t = TokenMap::new();
        t.insert(keys::DEVICE_ID, self.device_id.as_str());
        t.insert(keys::FW_ID, self.manifest_id.as_str());
        t.insert(keys::FW_VERSION, self.version.as_str());
        t.insert(keys::ACK_STATUS, if self.ok { ACK_OK } else { ACK_ERROR });
        t.insert(keys::ACK_MESSAGE, self.message.as_str());
        t.insert(keys::TIMESTAMP, self.timestamp.as_str());
        t.insert(keys::NONCE, self.nonce.as_str());
        t
    }
}

// ============================================
// Tests
// ============================================
