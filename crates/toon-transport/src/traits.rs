// ============================================
// File: crates/toon-transport/src/traits.rs
// ============================================
//! # Transport Trait
//!
//! ## Creation Reason
//! Defines the abstract interface the protocol client uses to exchange
//! TOON payloads with the server, enabling testability without a live
//! endpoint.
//!
//! ## Design Philosophy
//! - Payloads cross this boundary as opaque text; parsing and signature
//!   checks belong to the caller
//! - A non-success HTTP status is an `Err`, so callers have a single
//!   failure path to fold into backoff
//!
//! ## ⚠️ Important Note for Next Developer
//! - All trait methods are async for consistency
//! - Implementations must be Send + Sync
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definition

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Abstract interface for reaching the server.
///
/// # Example
/// ```ignore
/// async fn heartbeat<T: Transport>(transport: &T, payload: &str) -> Result<String> {
///     let (status, body) = transport.post("/api/devices/heartbeat", payload).await?;
///     tracing::debug!(status, "heartbeat exchanged");
///     Ok(body)
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a TOON payload as a request body.
    ///
    /// # Arguments
    /// * `path` - Endpoint path (e.g. `/api/devices/heartbeat`)
    /// * `body` - Wire-form payload text
    ///
    /// # Returns
    /// Tuple of (HTTP status, raw response text). Implementations
    /// return `Ok` for any status they consider deliverable; see each
    /// implementation for its policy.
    ///
    /// # Errors
    /// Returns error if the exchange fails at the network level.
    async fn post(&self, path: &str, body: &str) -> Result<(u16, String)>;

    /// Sends a TOON payload as a read, carried in a query parameter.
    ///
    /// # Arguments
    /// * `path` - Endpoint path (e.g. `/api/devices/commands`)
    /// * `query` - Wire-form payload text (escaped by the transport)
    ///
    /// # Errors
    /// Returns error if the exchange fails at the network level.
    async fn get(&self, path: &str, query: &str) -> Result<(u16, String)>;

    /// Streams an artifact from a raw URL into `dest`, in bounded
    /// chunks.
    ///
    /// # Errors
    /// Returns error on a non-success status, stream interruption, or
    /// local write failure. The destination file may be partial on
    /// error; cleanup is the caller's policy.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}
