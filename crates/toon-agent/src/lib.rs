// ============================================
// File: crates/toon-agent/src/lib.rs
// ============================================
//! # TOON Agent - Edge Device Protocol Client
//!
//! ## Creation Reason
//! The device-side engine of the TOON protocol: registers the device,
//! reports health, polls and acknowledges remote commands, and applies
//! signed firmware updates against a central server over an unreliable
//! network.
//!
//! ## Main Functionality
//! - [`config`]: agent configuration (one struct, passed by reference)
//! - [`telemetry`]: health metric provider interface + system reader
//! - [`storage`]: nonce ledger and audit sink (append-only JSONL)
//! - [`backoff`]: adaptive retry interval controller
//! - [`commands`]: command verification and dispatch
//! - [`firmware`]: manifest verification -> download -> checksum ->
//!   apply -> acknowledgment pipeline
//! - [`client`]: the protocol state machine and run loop
//!
//! ## Concurrency Model
//! One device instance is a single logical thread of control: the run
//! loop is strictly sequential, network calls are the only suspension
//! points, and nothing here is designed for concurrent mutation. A
//! fleet simulator runs one independent `DeviceClient` (with its own
//! ledger, keys, and backoff) per identity.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The nonce ledger write happens BEFORE every send; reordering that
//!   breaks the device's own no-reuse guarantee across crashes
//! - Registration rejection is the one fatal protocol error - a device
//!   that cannot register has no valid further state
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod backoff;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod firmware;
pub mod storage;
pub mod telemetry;

pub use client::{ClientState, DeviceClient};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
