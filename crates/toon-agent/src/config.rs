// ============================================
// File: crates/toon-agent/src/config.rs
// ============================================
//! # Agent Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the TOON agent: one explicit
//! struct, built once at startup and passed by reference into each
//! component's constructor. There are no ambient global lookups.
//!
//! ## Configuration Sections
//! - `server`: base URL and the out-of-band server public key
//! - `device`: identity and hardware description tokens
//! - `paths`: data directory (keys, ledgers, staging live under it)
//! - `retry`: backoff default/floor/ceiling
//!
//! ## Example Configuration
//! ```toml
//! [server]
//! url = "http://localhost:3000"
//! public_key_b64 = "mPmRYyV0Y..."
//!
//! [device]
//! id = "pi-lab-01"
//! manufacturer = "Raspberry_Pi_Foundation"
//! model = "Pi_4_Model_B"
//! firmware_version = "1.0.0"
//!
//! [paths]
//! data_dir = "/var/lib/toon"
//!
//! [retry]
//! default_secs = 60
//! floor_secs = 10
//! max_secs = 600
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Without `server.public_key_b64` the agent still heartbeats, but NO
//!   command and NO firmware manifest can ever verify - they are all
//!   dropped by policy
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AgentError, Result};

// ============================================
// AgentConfig
// ============================================

/// Main agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    /// Server endpoint configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Device identity configuration.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Filesystem layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Retry/backoff configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl AgentConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or fails
    /// validation.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AgentError::config(format!("read {}: {e}", path.display())))?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string (useful for testing).
    ///
    /// # Errors
    /// Returns error on parse or validation failure.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AgentError::config(format!("parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error when any section holds an unusable value.
    pub fn validate(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            return Err(AgentError::config("server.url must not be empty"));
        }
        if self.device.id.trim().is_empty() {
            return Err(AgentError::config("device.id must not be empty"));
        }
        if self.device.firmware_version.trim().is_empty() {
            return Err(AgentError::config(
                "device.firmware_version must not be empty",
            ));
        }
        if self.retry.floor_secs == 0 {
            return Err(AgentError::config("retry.floor_secs must be positive"));
        }
        if self.retry.floor_secs > self.retry.max_secs {
            return Err(AgentError::config(
                "retry.floor_secs must not exceed retry.max_secs",
            ));
        }
        Ok(())
    }

    // ========================================
    // Derived paths
    // ========================================

    /// Identity key file path.
    #[must_use]
    pub fn key_file(&self) -> PathBuf {
        self.paths.data_dir.join("device_keys.json")
    }

    /// Nonce ledger path.
    #[must_use]
    pub fn nonce_file(&self) -> PathBuf {
        self.paths.data_dir.join("nonces.jsonl")
    }

    /// Audit record path.
    #[must_use]
    pub fn audit_file(&self) -> PathBuf {
        self.paths.data_dir.join("audit.jsonl")
    }

    /// Staging directory for downloaded firmware artifacts.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.paths.data_dir.join("staging")
    }

    /// Active firmware slot path (target of the apply swap).
    #[must_use]
    pub fn active_image(&self) -> PathBuf {
        self.paths.data_dir.join("firmware.bin")
    }

    /// User-Agent string sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!(
            "TOON-Agent/{} ({})",
            env!("CARGO_PKG_VERSION"),
            self.device.model
        )
    }
}

// ============================================
// Sections
// ============================================

/// Server endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the central server.
    #[serde(default = "default_server_url")]
    pub url: String,

    /// The server's Ed25519 public key (base64), delivered out of band.
    ///
    /// Absent means no command or firmware manifest can ever be
    /// verified; such payloads are rejected by policy.
    #[serde(default)]
    pub public_key_b64: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            public_key_b64: None,
        }
    }
}

/// Device identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identifier, bound to the keypair at registration.
    #[serde(default = "default_device_id")]
    pub id: String,

    /// Device class tag.
    #[serde(default = "default_device_class")]
    pub class: String,

    /// Manufacturer name.
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Firmware version the device boots with (updated at runtime by
    /// successful firmware applies).
    #[serde(default = "default_firmware_version")]
    pub firmware_version: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: default_device_id(),
            class: default_device_class(),
            manufacturer: default_manufacturer(),
            model: default_model(),
            firmware_version: default_firmware_version(),
        }
    }
}

/// Filesystem layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding keys, ledgers, and staged artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Retry/backoff configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Baseline interval between loop iterations, seconds.
    #[serde(default = "default_retry_default")]
    pub default_secs: u64,

    /// Lower bound on any interval, seconds.
    #[serde(default = "default_retry_floor")]
    pub floor_secs: u64,

    /// Upper bound on any interval, seconds.
    #[serde(default = "default_retry_max")]
    pub max_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_secs: default_retry_default(),
            floor_secs: default_retry_floor(),
            max_secs: default_retry_max(),
        }
    }
}

// ============================================
// Defaults
// ============================================

fn default_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_device_id() -> String {
    // The hostname is a stable, human-meaningful default identity.
    #[cfg(target_os = "linux")]
    {
        if let Ok(name) = std::fs::read_to_string("/etc/hostname") {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    "toon-device".to_string()
}

fn default_device_class() -> String {
    "RPI_TERMINAL".to_string()
}

fn default_manufacturer() -> String {
    "Raspberry_Pi_Foundation".to_string()
}

fn default_model() -> String {
    "Pi_4_Model_B".to_string()
}

fn default_firmware_version() -> String {
    "1.0.0".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/toon")
}

fn default_retry_default() -> u64 {
    60
}

fn default_retry_floor() -> u64 {
    10
}

fn default_retry_max() -> u64 {
    600
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.default_secs, 60);
        assert_eq!(config.retry.floor_secs, 10);
        assert_eq!(config.retry.max_secs, 600);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = AgentConfig::from_str(
            r#"
            [server]
            url = "https://fleet.example.net"

            [device]
            id = "pi-lab-01"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.url, "https://fleet.example.net");
        assert_eq!(config.device.id, "pi-lab-01");
        // Unspecified sections keep their defaults.
        assert_eq!(config.device.class, "RPI_TERMINAL");
        assert_eq!(config.retry.max_secs, 600);
    }

    #[test]
    fn test_validation_rejects_bad_retry() {
        let result = AgentConfig::from_str(
            r#"
            [retry]
            floor_secs = 700
            max_secs = 600
            "#,
        );
        assert!(result.is_err());

        let result = AgentConfig::from_str(
            r#"
            [retry]
            floor_secs = 0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_empty_url() {
        let result = AgentConfig::from_str(
            r#"
            [server]
            url = ""
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_derived_paths() {
        let mut config = AgentConfig::default();
        config.paths.data_dir = PathBuf::from("/tmp/toon-test");
        assert_eq!(config.key_file(), PathBuf::from("/tmp/toon-test/device_keys.json"));
        assert_eq!(config.staging_dir(), PathBuf::from("/tmp/toon-test/staging"));
    }

    #[test]
    fn test_user_agent_carries_model() {
        let config = AgentConfig::default();
        assert!(config.user_agent().starts_with("TOON-Agent/"));
        assert!(config.user_agent().contains("Pi_4_Model_B"));
    }
}
