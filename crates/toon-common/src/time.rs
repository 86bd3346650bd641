// ============================================
// File: crates/toon-common/src/time.rs
// ============================================
//! # Wire-Clock Utilities
//!
//! ## Creation Reason
//! Every signed TOON message carries a `TS` token and heartbeats carry a
//! last-boot time; both must be formatted identically on every device or
//! canonical-form signatures stop matching what the server recomputes.
//!
//! ## Main Functionality
//! - [`wire_timestamp`]: the `TS` token format (`%Y-%m-%dT%H:%M:%S.000Z`)
//! - [`iso_from_unix`]: second-resolution ISO-8601 for last-boot reporting
//! - [`unix_timestamp`]: seconds since the epoch (heartbeat ids)
//!
//! ## ⚠️ Important Note for Next Developer
//! - The trailing `.000Z` is literal: the protocol truncates to whole
//!   seconds but keeps a millisecond field on the wire
//! - These strings are covered by message signatures - do not "fix" the
//!   format without a protocol version bump
//!
//! ## Last Modified
//! v0.1.0 - Initial wire-clock helpers

use chrono::{DateTime, TimeZone, Utc};

/// Format string for the `TS` token on every signed message.
const WIRE_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

/// Returns the current time in the wire `TS` format.
///
/// Example output: `2026-08-06T14:03:27.000Z`
#[must_use]
pub fn wire_timestamp() -> String {
    Utc::now().format(WIRE_TS_FORMAT).to_string()
}

/// Formats a Unix timestamp (seconds) as second-resolution ISO-8601 UTC.
///
/// Used for the heartbeat last-boot token. Out-of-range inputs fall back
/// to the epoch rather than failing; telemetry values must never abort
/// the signing path.
#[must_use]
pub fn iso_from_unix(secs: i64) -> String {
    let dt: DateTime<Utc> = Utc
        .timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Returns the current Unix timestamp in seconds.
#[must_use]
pub fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_timestamp_shape() {
        let ts = wire_timestamp();
        // 2026-08-06T14:03:27.000Z
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with(".000Z"));
        assert_eq!(&ts[10..11], "T");
        // No wire delimiters may ever appear in a TS value.
        assert!(!ts.contains('|'));
    }

    #[test]
    fn test_iso_from_unix() {
        assert_eq!(iso_from_unix(0), "1970-01-01T00:00:00Z");
        assert_eq!(iso_from_unix(1_600_000_000), "2020-09-13T12:26:40Z");
    }

    #[test]
    fn test_iso_from_unix_out_of_range() {
        // chrono rejects timestamps this large; helper must not panic.
        let iso = iso_from_unix(i64::MAX);
        assert_eq!(iso, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_unix_timestamp_sane() {
        // After 2020, before 2100.
        let now = unix_timestamp();
        assert!(now > 1_577_836_800);
        assert!(now < 4_102_444_800);
    }
}
