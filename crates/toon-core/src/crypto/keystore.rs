// ============================================
// File: crates/toon-core/src/crypto/keystore.rs
// ============================================
//! # Identity Key Persistence
//!
//! ## Creation Reason
//! The device identity must survive restarts: the server binds the
//! public key at registration, so regenerating the keypair orphans the
//! device. This module owns the load-or-create-once contract.
//!
//! ## Main Logical Flow
//! 1. Key file exists -> load it; any corruption is a hard error
//!    (regenerating would be worse than failing)
//! 2. No key file -> generate, write to `<path>.tmp`, chmod 0600,
//!    rename over the final path
//!
//! The temp-write + rename keeps a crash from ever leaving a partial
//! key file behind.
//!
//! ## Last Modified
//! v0.1.0 - Initial keystore

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::identity::DeviceKeyPair;
use crate::error::{CoreError, Result};
use toon_common::error::CommonError;

/// On-disk key file format.
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    version: String,
    key_type: String,
    public_key_b64: String,
    private_key_b64: String,
}

impl KeyFile {
    fn for_keypair(keypair: &DeviceKeyPair) -> Self {
        Self {
            version: "1.0".to_string(),
            key_type: "ed25519".to_string(),
            public_key_b64: keypair.public_key_b64(),
            private_key_b64: keypair.private_key_b64(),
        }
    }
}

/// Loads the device keypair from `path`, generating and persisting a
/// fresh one on first run.
///
/// # Errors
/// Returns an error if an existing key file cannot be read or decoded
/// (the identity is unrecoverable and must not be silently replaced),
/// or if a fresh key file cannot be persisted.
pub fn load_or_create(path: &Path) -> Result<DeviceKeyPair> {
    if path.exists() {
        return load(path);
    }

    info!(path = %path.display(), "No identity key file, generating device keypair");
    let keypair = DeviceKeyPair::generate();
    persist_atomic(path, &KeyFile::for_keypair(&keypair))?;
    Ok(keypair)
}

fn load(path: &Path) -> Result<DeviceKeyPair> {
    let content = fs::read_to_string(path)
        .map_err(|e| CommonError::io(format!("read key file {}", path.display()), e))?;
    let doc: KeyFile = serde_json::from_str(&content)
        .map_err(|e| CommonError::decoding("key file", e.to_string()))?;
    if doc.key_type != "ed25519" {
        return Err(CoreError::key(format!(
            "unsupported key type '{}'",
            doc.key_type
        )));
    }
    DeviceKeyPair::from_base64(&doc.private_key_b64)
}

/// Writes the key file atomically: temp file, owner-only permissions,
/// rename over the final path.
fn persist_atomic(path: &Path, doc: &KeyFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| CommonError::io(format!("create {}", parent.display()), e))?;
        }
    }

    let tmp = path.with_extension("tmp");
    let content = serde_json::to_string_pretty(doc)
        .map_err(|e| CommonError::encoding("key file", e.to_string()))?;
    fs::write(&tmp, content)
        .map_err(|e| CommonError::io(format!("write {}", tmp.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp, perms)
            .map_err(|e| CommonError::io(format!("chmod {}", tmp.display()), e))?;
    }

    fs::rename(&tmp, path)
        .map_err(|e| CommonError::io(format!("rename into {}", path.display()), e))?;
    Ok(())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_nonce;

    fn temp_key_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("toon-keystore-test-{}.json", generate_nonce()))
    }

    #[test]
    fn test_create_then_reload_same_identity() {
        let path = temp_key_path();

        let created = load_or_create(&path).unwrap();
        let reloaded = load_or_create(&path).unwrap();
        assert_eq!(created.public_key_bytes(), reloaded.public_key_bytes());

        // No temp artifact left behind after the atomic replace.
        assert!(!path.with_extension("tmp").exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_key_file_is_hard_error() {
        let path = temp_key_path();
        fs::write(&path, "{not json").unwrap();

        // A broken identity must never be silently regenerated.
        assert!(load_or_create(&path).is_err());

        let _ = fs::remove_file(&path);
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_key_path();
        load_or_create(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = fs::remove_file(&path);
    }
}
