// ============================================
// File: crates/toon-transport/src/mock.rs
// ============================================
//! # Mock Transport Implementation
//!
//! ## Creation Reason
//! Provides a scripted transport for testing protocol flows without a
//! live server or network access.
//!
//! ## Main Functionality
//! - Queued canned responses, consumed in order
//! - Request capture for verification
//! - Artifact byte injection and download failure toggles
//!
//! ## Usage in Tests
//! ```
//! use toon_transport::{MockTransport, Transport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mock = MockTransport::new();
//! mock.queue_response(200, "S1:registered");
//!
//! let (status, body) = mock.post("/api/devices/register", "D1:dev").await.unwrap();
//! assert_eq!(status, 200);
//! assert_eq!(body, "S1:registered");
//!
//! let sent = mock.take_requests();
//! assert_eq!(sent[0].path, "/api/devices/register");
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - An exhausted response queue is an `Err`, which doubles as a
//!   network-failure simulation
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// A captured request, for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    /// HTTP method (`POST` / `GET` / `DOWNLOAD`).
    pub method: &'static str,
    /// Endpoint path, or the raw URL for downloads.
    pub path: String,
    /// Payload text (body or query).
    pub body: String,
}

/// Scripted in-memory transport for tests.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<SentRequest>>,
    artifact: Mutex<Option<Vec<u8>>>,
    fail_downloads: Mutex<bool>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a canned (status, body) response; responses are consumed
    /// by `post`/`get` in FIFO order.
    pub fn queue_response(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .push_back((status, body.to_string()));
    }

    /// Sets the artifact bytes served by `download`.
    pub fn set_artifact(&self, bytes: Vec<u8>) {
        *self.artifact.lock() = Some(bytes);
    }

    /// Makes subsequent `download` calls fail.
    pub fn fail_downloads(&self, fail: bool) {
        *self.fail_downloads.lock() = fail;
    }

    /// Drains and returns all captured requests.
    pub fn take_requests(&self) -> Vec<SentRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    /// Number of captured requests without draining them.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_response(&self, method: &'static str, path: &str) -> Result<(u16, String)> {
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::request(format!("{method} {path}: connection refused")))
    }

    fn capture(&self, method: &'static str, path: &str, body: &str) {
        self.requests.lock().push(SentRequest {
            method,
            path: path.to_string(),
            body: body.to_string(),
        });
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, path: &str, body: &str) -> Result<(u16, String)> {
        self.capture("POST", path, body);
        self.next_response("POST", path)
    }

    async fn get(&self, path: &str, query: &str) -> Result<(u16, String)> {
        self.capture("GET", path, query);
        self.next_response("GET", path)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.capture("DOWNLOAD", url, "");
        if *self.fail_downloads.lock() {
            return Err(TransportError::download(format!("{url}: injected failure")));
        }
        let bytes = self
            .artifact
            .lock()
            .clone()
            .ok_or_else(|| TransportError::status(404, url))?;
        tokio::fs::write(dest, bytes)
            .await
            .map_err(|e| TransportError::download(format!("write {}: {e}", dest.display())))?;
        Ok(())
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued", &self.responses.lock().len())
            .field("captured", &self.requests.lock().len())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
