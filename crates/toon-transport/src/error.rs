// ============================================
// File: crates/toon-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for transport operations. Every variant here is
//! a "fold into the run loop's failure path" error for the caller -
//! transport failures grow backoff, they never crash the agent.
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use toon_common::error::CommonError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport error types.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the response not received.
    #[error("Request failed: {context}")]
    Request {
        /// What request was being made
        context: String,
    },

    /// The server answered with a non-success HTTP status.
    #[error("Unexpected status {status} from {endpoint}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Endpoint that returned it
        endpoint: String,
    },

    /// An artifact download failed mid-stream.
    #[error("Download failed: {context}")]
    Download {
        /// What failed during the transfer
        context: String,
    },

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    /// Creates a `Request` error.
    pub fn request(context: impl Into<String>) -> Self {
        Self::Request {
            context: context.into(),
        }
    }

    /// Creates a `Status` error.
    pub fn status(status: u16, endpoint: impl Into<String>) -> Self {
        Self::Status {
            status,
            endpoint: endpoint.into(),
        }
    }

    /// Creates a `Download` error.
    pub fn download(context: impl Into<String>) -> Self {
        Self::Download {
            context: context.into(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::status(503, "/api/devices/heartbeat");
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("heartbeat"));
    }
}
