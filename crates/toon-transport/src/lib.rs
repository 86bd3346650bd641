// ============================================
// File: crates/toon-transport/src/lib.rs
// ============================================
//! # TOON Transport - HTTP Transport Layer
//!
//! ## Creation Reason
//! Isolates how payloads reach the server from what they mean. The
//! protocol client talks to the [`Transport`] trait only; production
//! uses the reqwest-backed [`HttpTransport`], tests use
//! [`MockTransport`].
//!
//! ## Main Functionality
//! - [`traits::Transport`]: post / get / download interface
//! - [`http::HttpTransport`]: production HTTP implementation
//! - [`mock::MockTransport`]: scripted in-memory implementation
//!
//! ## Design Philosophy
//! - Traits enable mock implementations for testing
//! - Async-first design with `async_trait`
//! - The transport never interprets payloads; it moves text and bytes
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - Timeouts live here, at the transport boundary - the protocol core
//!   never cancels an exchange mid-flight
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod http;
pub mod mock;
pub mod traits;

pub use error::{Result, TransportError};
pub use http::HttpTransport;
pub use mock::MockTransport;
pub use traits::Transport;
