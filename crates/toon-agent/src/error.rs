// ============================================
// File: crates/toon-agent/src/error.rs
// ============================================
//! # Agent Error Types
//!
//! ## Creation Reason
//! Defines the agent-level error taxonomy: protocol rejections that are
//! fatal (registration), state misuse, and wrapped errors from the
//! lower crates.
//!
//! ## Error Handling Design
//! - Transport and storage errors bubble up through these variants into
//!   the run loop, which folds them into backoff growth
//! - `RegistrationRejected` is the exception: it propagates out of the
//!   run loop entirely, since an unregistered device has no valid
//!   further protocol state
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use crate::storage::StorageError;
use toon_common::error::CommonError;
use toon_core::error::CoreError;
use toon_transport::error::TransportError;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration is invalid.
    #[error("Invalid configuration: {context}")]
    Config {
        /// What is wrong with the configuration
        context: String,
    },

    /// The server refused the registration request. Fatal.
    #[error("Registration rejected by server (status '{status}')")]
    RegistrationRejected {
        /// The status token the server answered with
        status: String,
    },

    /// Operation attempted in the wrong client state.
    #[error("Invalid state for operation: {operation} requires a registered device")]
    NotRegistered {
        /// What operation was attempted
        operation: String,
    },

    /// Local durable storage failed (nonce ledger).
    ///
    /// Never swallowed: the device cannot uphold its no-reuse guarantee
    /// without the ledger.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Error from the transport crate.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl AgentError {
    /// Creates a `Config` error.
    pub fn config(context: impl Into<String>) -> Self {
        Self::Config {
            context: context.into(),
        }
    }

    /// Returns `true` if this error ends the run loop rather than
    /// feeding the backoff path.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RegistrationRejected { .. } | Self::Config { .. }
        )
    }
}

// ============================================
// Tests
// ============================================
