// ============================================
// File: crates/toon-common/src/lib.rs
// ============================================
//! # TOON Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides foundational types shared across all TOON agent crates,
//! ensuring consistency and reducing code duplication.
//!
//! ## Main Functionality
//! - [`error`]: Common error types and result aliases
//! - [`time`]: Wire-clock helpers (ISO-8601 protocol timestamps)
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               toon-agent                            │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │    toon-core           toon-transport               │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │              toon-common  ◄── You are here          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - keep dependencies minimal
//! - Timestamp formats here ARE the wire format; changing them breaks
//!   signature verification against the server
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;

pub use error::{CommonError, Result};
