// ============================================
// File: crates/toon-agent/src/storage.rs
// ============================================
//! # Durable Device Storage
//!
//! ## Creation Reason
//! Two things must survive a crash: the set of nonces this device has
//! ever emitted (its own no-reuse guarantee) and the audit trail of raw
//! exchanges. Both are append-only JSONL files - one JSON record per
//! line, written with an immediate flush, reloaded line-wise on open.
//!
//! ## Main Functionality
//! - [`NonceLedger`]: unique-keyed, append-only nonce set with an
//!   in-memory index
//! - [`AuditSink`]: fire-and-forget exchange recorder
//! - [`JsonlAudit`] / [`NullAudit`]: file-backed and discarding sinks
//!
//! ## ⚠️ Important Note for Next Developer
//! - `NonceLedger::record` is called BEFORE the message is sent, so a
//!   crash mid-send cannot lead a retry to reuse the nonce
//! - Ledger growth is unbounded by design; retention/rotation is an
//!   operational policy applied while the agent is stopped
//! - Audit failures must never abort protocol flow - they are warned
//!   and dropped
//!
//! ## Last Modified
//! v0.1.0 - Initial storage implementation

use std::collections::HashSet;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use toon_common::time::wire_timestamp;

// ============================================
// StorageError
// ============================================

/// Durable storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A ledger line could not be parsed.
    #[error("Corrupt ledger record: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================
// NonceLedger
// ============================================

/// One ledger line: a nonce and when it was emitted.
#[derive(Debug, Serialize, Deserialize)]
struct NonceRecord {
    nonce: String,
    recorded_at: String,
}

/// Append-only ledger of every nonce this device has emitted.
///
/// Enforces the device's OWN non-reuse guarantee; server-side replay
/// rejection is the server's independent responsibility.
pub struct NonceLedger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl NonceLedger {
    /// Opens the ledger, creating parent directories and rebuilding the
    /// in-memory index from existing records.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or holds a corrupt
    /// record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut seen = HashSet::new();
        if path.exists() {
            let file = std::fs::File::open(&path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: NonceRecord = serde_json::from_str(&line)?;
                seen.insert(record.nonce);
            }
        }

        Ok(Self { path, seen })
    }

    /// Durably records a nonce. Insert-or-replace: recording an already
    /// present nonce is a no-op (the file stays unique-keyed).
    ///
    /// Called immediately after generating the nonce, before the
    /// message is sent.
    ///
    /// # Errors
    /// Returns error if the append cannot be written - the device must
    /// not send a message whose nonce it failed to persist.
    pub fn record(&mut self, nonce: &str) -> Result<(), StorageError> {
        if self.seen.contains(nonce) {
            return Ok(());
        }

        let record = NonceRecord {
            nonce: nonce.to_string(),
            recorded_at: wire_timestamp(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, &record)?;
        file.write_all(b"\n")?;
        file.flush()?;

        self.seen.insert(nonce.to_string());
        Ok(())
    }

    /// Returns `true` if this device has ever emitted `nonce`.
    ///
    /// A hit for a freshly generated nonce is a correctness bug (a
    /// broken RNG), not a valid replay - nonces are generated locally
    /// and expected globally unique with overwhelming probability.
    #[must_use]
    pub fn seen(&self, nonce: &str) -> bool {
        self.seen.contains(nonce)
    }

    /// Number of recorded nonces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if no nonce has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl fmt::Debug for NonceLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceLedger")
            .field("path", &self.path)
            .field("recorded", &self.seen.len())
            .finish()
    }
}

// ============================================
// AuditSink
// ============================================

/// Direction of an audited exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Device to server.
    Out,
    /// Server to device.
    In,
}

/// Fire-and-forget recorder of raw protocol exchanges.
///
/// Best effort by contract: a failing sink must never abort protocol
/// flow.
pub trait AuditSink: Send + Sync {
    /// Records one exchange: message kind, direction, raw payload text.
    fn record(&self, kind: &str, direction: Direction, raw: &str);
}

/// One audit line.
#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    ts: String,
    kind: &'a str,
    direction: Direction,
    raw: &'a str,
}

/// File-backed audit sink, one JSON record per line.
#[derive(Debug)]
pub struct JsonlAudit {
    path: PathBuf,
}

impl JsonlAudit {
    /// Opens the audit file (created on first record).
    ///
    /// # Errors
    /// Returns error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    fn append(&self, kind: &str, direction: Direction, raw: &str) -> Result<(), StorageError> {
        let record = AuditRecord {
            ts: wire_timestamp(),
            kind,
            direction,
            raw,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, &record)?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

impl AuditSink for JsonlAudit {
    fn record(&self, kind: &str, direction: Direction, raw: &str) {
        if let Err(e) = self.append(kind, direction, raw) {
            warn!(kind, error = %e, "audit record dropped");
        }
    }
}

/// Discarding audit sink for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _kind: &str, _direction: Direction, _raw: &str) {}
}

// ============================================
// Tests
// ============================================
