// ============================================
// File: crates/toon-agent/src/backoff.rs
// ============================================
//! # Backoff Controller
//!
//! ## Creation Reason
//! The wait between run-loop iterations is negotiated: the server may
//! direct a retry interval (`RTO` token), failures grow it, and quiet
//! success reverts it. Centralizing the rules here keeps the interval
//! from creeping permanently after a single transient server omission.
//!
//! ## Interval Rules
//! - Success with a directive `d` -> `clamp(d, floor, ceiling)`
//! - Success without a directive  -> configured default
//! - Failure                      -> `clamp(current * 2, floor, ceiling)`
//!
//! ## Last Modified
//! v0.1.0 - Initial backoff controller

use std::time::Duration;

use tracing::debug;

use crate::config::RetryConfig;

/// Adaptive retry interval controller.
///
/// Not designed for concurrent access: one controller belongs to one
/// device instance, mutated only from its run loop.
#[derive(Debug, Clone)]
pub struct BackoffController {
    default: Duration,
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl BackoffController {
    /// Creates a controller seeded with the configured default.
    #[must_use]
    pub fn new(retry: &RetryConfig) -> Self {
        let floor = Duration::from_secs(retry.floor_secs);
        let ceiling = Duration::from_secs(retry.max_secs);
        let default = Duration::from_secs(retry.default_secs).clamp(floor, ceiling);
        Self {
            default,
            floor,
            ceiling,
            current: default,
        }
    }

    /// The interval to wait before the next iteration.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Applies the outcome of a successful exchange.
    ///
    /// A server directive (seconds) is clamped into [floor, ceiling];
    /// no directive reverts to the configured default.
    pub fn on_success(&mut self, directive_secs: Option<u64>) {
        self.current = match directive_secs {
            Some(secs) => {
                let directed = Duration::from_secs(secs).clamp(self.floor, self.ceiling);
                debug!(rto_secs = directed.as_secs(), "server retry directive applied");
                directed
            }
            None => self.default,
        };
    }

    /// Applies an exchange failure: the interval doubles, clamped.
    pub fn on_failure(&mut self) {
        let doubled = self
            .current
            .checked_mul(2)
            .unwrap_or(self.ceiling)
            .clamp(self.floor, self.ceiling);
        debug!(backoff_secs = doubled.as_secs(), "backoff grown after failure");
        self.current = doubled;
    }
}

// ============================================
// Tests
// ============================================
