// ============================================
// File: crates/toon-agent/src/telemetry.rs
// ============================================
//! # Telemetry Provider
//!
//! ## Creation Reason
//! Heartbeats carry health metrics, but metric collection is
//! platform glue, not protocol logic. This interface keeps the signing
//! path deterministic: a provider must NEVER fail - on measurement
//! failure it returns a documented default instead.
//!
//! ## Main Functionality
//! - [`TelemetryProvider`]: the collaborator interface
//! - [`SystemTelemetry`]: Linux /proc and /sys readers with fallbacks
//! - [`StaticTelemetry`]: fixed values for tests and simulators
//!
//! ## Documented Defaults
//! | metric          | failure default |
//! |-----------------|-----------------|
//! | uptime          | 0 seconds       |
//! | memory used     | 0 MB            |
//! | CPU temperature | 0.0 °C          |
//! | last boot       | current time    |
//! | network status  | ONLINE          |
//!
//! ## Last Modified
//! v0.1.0 - Initial telemetry provider

use std::fmt;

use toon_common::time::{iso_from_unix, unix_timestamp};

// ============================================
// NetworkStatus
// ============================================

/// Network link state as reported in heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// At least one non-loopback interface is up.
    Online,
    /// No interface is up.
    Offline,
}

impl NetworkStatus {
    /// Wire token value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// TelemetryProvider
// ============================================

/// Health metric collaborator consumed by the protocol client.
///
/// Implementations must never panic or block for long; every method
/// resolves to a value, falling back to the documented default on
/// measurement failure. Failures here must not propagate into the
/// signing path.
pub trait TelemetryProvider: Send + Sync {
    /// Seconds since boot (default 0).
    fn uptime_seconds(&self) -> u64;

    /// Memory in use, MB (default 0).
    fn memory_used_mb(&self) -> u64;

    /// CPU temperature in °C, one-decimal precision (default 0.0).
    fn cpu_temperature_c(&self) -> f64;

    /// Last boot time, ISO-8601 UTC (default: current time).
    fn last_boot_iso(&self) -> String;

    /// Network link state (default ONLINE).
    fn network_status(&self) -> NetworkStatus;
}

// ============================================
// SystemTelemetry
// ============================================

/// Reads metrics from the running system.
///
/// Linux sources: `/proc/uptime`, `/proc/meminfo`,
/// `/sys/class/thermal/thermal_zone0/temp`,
/// `/sys/class/net/<if>/operstate`. Non-Linux builds return the
/// documented defaults for everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTelemetry;

impl SystemTelemetry {
    /// Creates a system telemetry reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TelemetryProvider for SystemTelemetry {
    fn uptime_seconds(&self) -> u64 {
        #[cfg(target_os = "linux")]
        {
            std::fs::read_to_string("/proc/uptime")
                .ok()
                .and_then(|content| {
                    content
                        .split_whitespace()
                        .next()?
                        .parse::<f64>()
                        .ok()
                })
                .map_or(0, |secs| secs as u64)
        }
        #[cfg(not(target_os = "linux"))]
        {
            0
        }
    }

    fn memory_used_mb(&self) -> u64 {
        #[cfg(target_os = "linux")]
        {
            std::fs::read_to_string("/proc/meminfo")
                .ok()
                .and_then(|content| {
                    let mut total = 0u64;
                    let mut avail = 0u64;
                    for line in content.lines() {
                        if line.starts_with("MemTotal:") {
                            total = line.split_whitespace().nth(1)?.parse().ok()?;
                        } else if line.starts_with("MemAvailable:") {
                            avail = line.split_whitespace().nth(1)?.parse().ok()?;
                        }
                    }
                    Some(total.saturating_sub(avail) / 1024)
                })
                .unwrap_or(0)
        }
        #[cfg(not(target_os = "linux"))]
        {
            0
        }
    }

    fn cpu_temperature_c(&self) -> f64 {
        #[cfg(target_os = "linux")]
        {
            // Millidegrees on most boards (Pi included).
            std::fs::read_to_string("/sys/class/thermal/thermal_zone0/temp")
                .ok()
                .and_then(|content| content.trim().parse::<i64>().ok())
                .map_or(0.0, |milli| (milli as f64 / 100.0).round() / 10.0)
        }
        #[cfg(not(target_os = "linux"))]
        {
            0.0
        }
    }

    fn last_boot_iso(&self) -> String {
        let uptime = self.uptime_seconds();
        if uptime == 0 {
            return iso_from_unix(unix_timestamp());
        }
        iso_from_unix(unix_timestamp() - uptime as i64)
    }

    fn network_status(&self) -> NetworkStatus {
        #[cfg(target_os = "linux")]
        {
            let Ok(entries) = std::fs::read_dir("/sys/class/net") else {
                return NetworkStatus::Online;
            };
            let mut saw_interface = false;
            for entry in entries.flatten() {
                if entry.file_name() == "lo" {
                    continue;
                }
                saw_interface = true;
                let operstate = entry.path().join("operstate");
                if let Ok(state) = std::fs::read_to_string(operstate) {
                    if state.trim() == "up" {
                        return NetworkStatus::Online;
                    }
                }
            }
            if saw_interface {
                NetworkStatus::Offline
            } else {
                NetworkStatus::Online
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            NetworkStatus::Online
        }
    }
}

// ============================================
// StaticTelemetry
// ============================================

/// Fixed-value provider for tests and fleet simulation.
#[derive(Debug, Clone)]
pub struct StaticTelemetry {
    /// Reported uptime, seconds.
    pub uptime_secs: u64,
    /// Reported memory use, MB.
    pub memory_mb: u64,
    /// Reported CPU temperature, °C.
    pub cpu_temp_c: f64,
    /// Reported last boot, ISO-8601 UTC.
    pub last_boot: String,
    /// Reported link state.
    pub network: NetworkStatus,
}

impl Default for StaticTelemetry {
    fn default() -> Self {
        Self {
            uptime_secs: 86_400,
            memory_mb: 412,
            cpu_temp_c: 47.5,
            last_boot: "2026-08-05T12:00:00Z".to_string(),
            network: NetworkStatus::Online,
        }
    }
}

impl TelemetryProvider for StaticTelemetry {
    fn uptime_seconds(&self) -> u64 {
        self.uptime_secs
    }

    fn memory_used_mb(&self) -> u64 {
        self.memory_mb
    }

    fn cpu_temperature_c(&self) -> f64 {
        self.cpu_temp_c
    }

    fn last_boot_iso(&self) -> String {
        self.last_boot.clone()
    }

    fn network_status(&self) -> NetworkStatus {
        self.network
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_telemetry_never_panics() {
        // Whatever the host looks like, every metric must resolve.
        let telemetry = SystemTelemetry::new();
        let _ = telemetry.uptime_seconds();
        let _ = telemetry.memory_used_mb();
        let temp = telemetry.cpu_temperature_c();
        assert!(temp.is_finite());
        let boot = telemetry.last_boot_iso();
        assert!(boot.ends_with('Z'));
        let _ = telemetry.network_status();
    }

    #[test]
    fn test_network_status_tokens() {
        assert_eq!(NetworkStatus::Online.as_str(), "ONLINE");
        assert_eq!(NetworkStatus::Offline.as_str(), "OFFLINE");
    }

    #[test]
    fn test_static_telemetry() {
        let telemetry = StaticTelemetry::default();
        assert_eq!(telemetry.uptime_seconds(), 86_400);
        assert_eq!(telemetry.network_status(), NetworkStatus::Online);
        assert_eq!(telemetry.last_boot_iso(), "2026-08-05T12:00:00Z");
    }
}
