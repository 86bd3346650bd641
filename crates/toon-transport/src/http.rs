// ============================================
// File: crates/toon-transport/src/http.rs
// ============================================
//! # HTTP Transport Implementation
//!
//! ## Creation Reason
//! Production transport over reqwest: TOON payloads travel as
//! `text/plain` bodies (or a `toon` query parameter on reads), firmware
//! artifacts stream to disk in bounded chunks.
//!
//! ## Main Logical Flow
//! 1. Client built once with a request timeout
//! 2. `post`/`get` return (status, text) for any HTTP answer - the
//!    protocol layer decides what a given status means
//! 3. `download` is stricter: only 200 is a success, anything else or a
//!    broken stream is an error
//!
//! ## ⚠️ Important Note for Next Developer
//! - The `toon` query parameter is URL-escaped by reqwest; do not
//!   pre-escape the payload
//!
//! ## Last Modified
//! v0.1.0 - Initial HTTP transport

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Production HTTP transport for the TOON protocol.
pub struct HttpTransport {
    base_url: String,
    user_agent: String,
    http: Client,
}

impl HttpTransport {
    /// Creates a transport against `base_url` (trailing `/` stripped).
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        Self::with_timeout(base_url, user_agent, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport with an explicit request timeout.
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn with_timeout(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::request(format!("build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: &str) -> Result<(u16, String)> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "text/plain")
            .header("Accept", "text/plain")
            .header("User-Agent", &self.user_agent)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| TransportError::request(format!("POST {path}: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::request(format!("read {path} response: {e}")))?;
        debug!(path, status, bytes = text.len(), "POST exchanged");
        Ok((status, text))
    }

    async fn get(&self, path: &str, query: &str) -> Result<(u16, String)> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .query(&[("toon", query)])
            .header("Accept", "text/plain")
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| TransportError::request(format!("GET {path}: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::request(format!("read {path} response: {e}")))?;
        debug!(path, status, bytes = text.len(), "GET exchanged");
        Ok((status, text))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .http
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| TransportError::download(format!("GET {url}: {e}")))?;

        if response.status().as_u16() != 200 {
            return Err(TransportError::status(response.status().as_u16(), url));
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| TransportError::download(format!("create {}: {e}", dest.display())))?;

        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransportError::download(format!("stream {url}: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| TransportError::download(format!("write {}: {e}", dest.display())))?;
            written += chunk.len();
        }
        file.flush()
            .await
            .map_err(|e| TransportError::download(format!("flush {}: {e}", dest.display())))?;

        debug!(url, bytes = written, dest = %dest.display(), "artifact downloaded");
        Ok(())
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
