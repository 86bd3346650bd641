// ============================================
// File: crates/toon-agent/src/firmware.rs
// ============================================
//! # Firmware Update Pipeline
//!
//! ## Creation Reason
//! Applying remote firmware is the highest-risk thing this agent does.
//! The pipeline is a sequence of hard gates - manifest signature,
//! download, checksum, apply - where failure at any gate aborts the
//! remaining stages and is reported truthfully, never partially
//! applied.
//!
//! ## Stage Order
//! 1. Manifest verification (`FW_SIG` over {FW1, FW2, FW4, FW5});
//!    failure aborts with no side effects
//! 2. Download to `staging/<id>.bin`
//! 3. Streamed sha256, compared case-insensitively to `FW4`; a
//!    mismatched staged file is left in place for external cleanup
//! 4. Pluggable apply stage (swap into the active slot)
//! 5. Signed acknowledgment - ALWAYS sent once staging began, truthful
//!    either way; the tracked firmware version advances only on success
//!
//! ## ⚠️ Important Note for Next Developer
//! - A failed apply keeps the previous version authoritative; the
//!   device is expected to keep running the prior firmware
//! - [`ForcedFailure`] exists so test harnesses can exercise the
//!   failure ack without touching the verification stages
//!
//! ## Last Modified
//! v0.1.0 - Initial update pipeline

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use toon_common::error::CommonError;
use toon_common::time::wire_timestamp;
use toon_core::token::{keys, FirmwareAck, TokenMap};
use toon_core::ServerPublicKey;

use crate::client::{DeviceClient, FIRMWARE_ACK_PATH};
use crate::error::Result;
use crate::storage::Direction;

/// Download/digest chunk size.
const CHUNK_SIZE: usize = 64 * 1024;

// ============================================
// FirmwareManifest
// ============================================

/// The signed description of an available firmware artifact, as carried
/// on a firmware-check response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareManifest {
    /// Manifest id (`FW1`).
    pub id: Option<String>,
    /// Target version (`FW2`).
    pub version: Option<String>,
    /// Artifact URL (`FW3`).
    pub url: Option<String>,
    /// Artifact sha256, hex (`FW4`).
    pub checksum: Option<String>,
    /// Artifact size in bytes (`FW5`).
    pub size: Option<String>,
    /// Server signature over the signed subset (`FW_SIG`).
    pub signature: Option<String>,
}

impl FirmwareManifest {
    /// Extracts the manifest fields from a firmware-check response.
    #[must_use]
    pub fn from_response(tokens: &TokenMap) -> Self {
        Self {
            id: tokens.get(keys::FW_ID).map(str::to_string),
            version: tokens.get(keys::FW_VERSION).map(str::to_string),
            url: tokens.get(keys::FW_URL).map(str::to_string),
            checksum: tokens.get(keys::FW_CHECKSUM).map(str::to_string),
            size: tokens.get(keys::FW_SIZE).map(str::to_string),
            signature: tokens.get(keys::FW_SIG).map(str::to_string),
        }
    }

    /// Artifact name used for the staging file.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        self.id.as_deref().unwrap_or("fw")
    }

    /// The canonical subset covered by `FW_SIG`: {id, version,
    /// checksum, size}, absent fields omitted.
    #[must_use]
    pub fn signed_tokens(&self) -> TokenMap {
        let mut subset = TokenMap::new();
        subset.insert_opt(keys::FW_ID, self.id.as_deref());
        subset.insert_opt(keys::FW_VERSION, self.version.as_deref());
        subset.insert_opt(keys::FW_CHECKSUM, self.checksum.as_deref());
        subset.insert_opt(keys::FW_SIZE, self.size.as_deref());
        subset
    }

    /// Verifies the manifest signature.
    ///
    /// No configured server key, a missing signature, or a mismatch all
    /// resolve to `false` - the manifest is only actionable once this
    /// returns `true`.
    #[must_use]
    pub fn verify(&self, server_key: Option<&ServerPublicKey>) -> bool {
        let (Some(key), Some(signature)) = (server_key, self.signature.as_deref()) else {
            return false;
        };
        key.verify_b64(&self.signed_tokens().canonical_bytes(), signature)
    }
}

// ============================================
// ApplyStage
// ============================================

/// The device-specific final stage: swap a verified staged artifact
/// into the active slot.
///
/// Returns a plain success flag; the pipeline turns it into a truthful
/// acknowledgment either way.
pub trait ApplyStage: Send + Sync {
    /// Applies the staged artifact. Must not panic.
    fn apply(&self, staged: &Path) -> bool;
}

/// Default apply stage: copies the staged artifact over the active
/// image path.
#[derive(Debug)]
pub struct StagedSwap {
    active_path: PathBuf,
}

impl StagedSwap {
    /// Creates a swap stage targeting `active_path`.
    #[must_use]
    pub fn new(active_path: PathBuf) -> Self {
        Self { active_path }
    }
}

impl ApplyStage for StagedSwap {
    fn apply(&self, staged: &Path) -> bool {
        if !staged.exists() {
            warn!(staged = %staged.display(), "staged artifact missing at apply time");
            return false;
        }
        if let Some(parent) = self.active_path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return false;
            }
        }
        match std::fs::copy(staged, &self.active_path) {
            Ok(bytes) => {
                info!(bytes, active = %self.active_path.display(), "firmware swapped into active slot");
                true
            }
            Err(e) => {
                warn!(error = %e, "firmware swap failed");
                false
            }
        }
    }
}

/// Apply stage that always fails, for test harnesses simulating an
/// apply failure without altering any prior verification.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForcedFailure;

impl ApplyStage for ForcedFailure {
    fn apply(&self, _staged: &Path) -> bool {
        false
    }
}

// ============================================
// Checksum
// ============================================

/// Streams a file through sha256 and returns the lowercase hex digest.
fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ============================================
// Pipeline
// ============================================

impl DeviceClient {
    /// Runs the firmware update pipeline against a firmware-check
    /// response carrying a manifest.
    ///
    /// Returns whether the update was applied. Once the manifest
    /// verifies, a signed acknowledgment is always sent - truthful on
    /// both success and failure - and the locally tracked firmware
    /// version advances only on success.
    ///
    /// # Errors
    /// Transport failure on the acknowledgment, or a local I/O failure
    /// while digesting the artifact, propagates to the caller's failure
    /// path.
    pub async fn firmware_update(&mut self, check: &TokenMap) -> Result<bool> {
        let manifest = FirmwareManifest::from_response(check);

        // Gate 1: the manifest is only actionable once its signature
        // validates. No side effects on failure.
        if !manifest.verify(self.server_key.as_ref()) {
            warn!("firmware manifest signature rejected");
            self.audit
                .record("fw_manifest", Direction::In, "ERR: invalid FW_SIG");
            return Ok(false);
        }

        let (applied, message) = self.stage_and_apply(&manifest).await?;

        // Gate 5: the server always receives a truthful status.
        let ack = FirmwareAck {
            device_id: self.device.id.clone(),
            manifest_id: manifest.artifact_id().to_string(),
            version: manifest.version.clone().unwrap_or_default(),
            ok: applied,
            message,
            timestamp: wire_timestamp(),
            nonce: self.fresh_nonce()?,
        };
        self.exchange(&ack, FIRMWARE_ACK_PATH, false).await?;

        if applied {
            if let Some(version) = &manifest.version {
                info!(%version, "firmware version updated");
                self.current_fw = version.clone();
            }
        }
        Ok(applied)
    }

    /// Gates 2-4: download, checksum, apply. Returns the apply flag and
    /// the acknowledgment message.
    async fn stage_and_apply(&mut self, manifest: &FirmwareManifest) -> Result<(bool, String)> {
        // Gate 2: download to the staging path.
        let Some(url) = manifest.url.clone() else {
            self.audit
                .record("fw_download", Direction::In, "ERR: download failed");
            return Ok((false, "Artifact download failed".to_string()));
        };
        std::fs::create_dir_all(&self.staging_dir).map_err(|e| {
            CommonError::io(format!("create {}", self.staging_dir.display()), e)
        })?;
        let staged = self
            .staging_dir
            .join(format!("{}.bin", manifest.artifact_id()));

        if let Err(e) = self.transport.download(&url, &staged).await {
            warn!(error = %e, %url, "firmware download failed");
            self.audit
                .record("fw_download", Direction::In, "ERR: download failed");
            return Ok((false, "Artifact download failed".to_string()));
        }

        // Gate 3: digest the staged bytes and compare, case-normalized.
        // A mismatched file stays in staging for external cleanup.
        if let Some(expected) = &manifest.checksum {
            let actual = sha256_file(&staged)
                .map_err(|e| CommonError::io(format!("digest {}", staged.display()), e))?;
            if !actual.eq_ignore_ascii_case(expected) {
                warn!(%expected, %actual, "firmware checksum mismatch");
                self.audit
                    .record("fw_checksum", Direction::In, "ERR: checksum mismatch");
                return Ok((false, "Checksum verification failed".to_string()));
            }
        }

        // Gate 4: device-specific apply.
        let applied = self.apply_stage.apply(&staged);
        let message = if applied {
            "Firmware applied successfully"
        } else {
            "Apply failed, rolled back"
        };
        Ok((applied, message.to_string()))
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use toon_core::{generate_nonce, DeviceKeyPair};
    use toon_transport::MockTransport;

    use crate::config::AgentConfig;
    use crate::storage::{NonceLedger, NullAudit};
    use crate::telemetry::StaticTelemetry;

    /// Apply stage that counts invocations, to prove aborted pipelines
    /// never reach it.
    #[derive(Default)]
    struct CountingApply {
        calls: Arc<AtomicUsize>,
        succeed: bool,
    }

    impl ApplyStage for CountingApply {
        fn apply(&self, _staged: &Path) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.succeed
        }
    }

    struct Harness {
        client: DeviceClient,
        mock: Arc<MockTransport>,
        server_keys: DeviceKeyPair,
        apply_calls: Arc<AtomicUsize>,
        data_dir: PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.data_dir);
        }
    }

    fn harness(apply_succeeds: bool) -> Harness {
        let data_dir =
            std::env::temp_dir().join(format!("toon-firmware-test-{}", generate_nonce()));
        std::fs::create_dir_all(&data_dir).unwrap();

        let server_keys = DeviceKeyPair::generate();
        let mut config = AgentConfig::default();
        config.device.id = "pi-test-01".to_string();
        config.paths.data_dir = data_dir.clone();
        config.server.public_key_b64 = Some(server_keys.public_key_b64());

        let mock = Arc::new(MockTransport::new());
        let apply_calls = Arc::new(AtomicUsize::new(0));
        let client = DeviceClient::new(
            &config,
            DeviceKeyPair::generate(),
            mock.clone(),
            Arc::new(StaticTelemetry::default()),
            Arc::new(NullAudit),
            NonceLedger::open(config.nonce_file()).unwrap(),
        )
        .unwrap()
        .with_apply_stage(Box::new(CountingApply {
            calls: apply_calls.clone(),
            succeed: apply_succeeds,
        }));

        Harness {
            client,
            mock,
            server_keys,
            apply_calls,
            data_dir,
        }
    }

    /// Builds a firmware-check response with a correctly signed
    /// manifest for the given artifact bytes.
    fn manifest_response(server_keys: &DeviceKeyPair, artifact: &[u8]) -> TokenMap {
        let checksum = hex::encode(Sha256::digest(artifact));
        let mut tokens = TokenMap::new();
        tokens.insert("S1", "update_available");
        tokens.insert("FW1", "fw-2026-08");
        tokens.insert("FW2", "1.1.0");
        tokens.insert("FW3", "http://srv/artifacts/fw-2026-08.bin");
        tokens.insert("FW4", checksum);
        tokens.insert("FW5", artifact.len().to_string());

        let manifest = FirmwareManifest::from_response(&tokens);
        let signature = server_keys.sign_b64(&manifest.signed_tokens().canonical_bytes());
        tokens.insert("FW_SIG", signature);
        tokens
    }

    #[test]
    fn test_manifest_verify() {
        let server_keys = DeviceKeyPair::generate();
        let key = ServerPublicKey::from_base64(&server_keys.public_key_b64()).unwrap();
        let tokens = manifest_response(&server_keys, b"artifact");
        let manifest = FirmwareManifest::from_response(&tokens);

        assert!(manifest.verify(Some(&key)));
        // No configured key -> rejected by policy.
        assert!(!manifest.verify(None));

        // Tampering any signed field invalidates it.
        let mut tampered_tokens = tokens.clone();
        tampered_tokens.insert("FW2", "9.9.9");
        let tampered = FirmwareManifest::from_response(&tampered_tokens);
        assert!(!tampered.verify(Some(&key)));
    }

    #[test]
    fn test_sha256_file_digest() {
        let path =
            std::env::temp_dir().join(format!("toon-digest-test-{}", generate_nonce()));
        std::fs::write(&path, b"hello firmware").unwrap();
        let digest = sha256_file(&path).unwrap();
        assert_eq!(digest, hex::encode(Sha256::digest(b"hello firmware")));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_update_applies_and_advances_version() {
        let mut h = harness(true);
        let artifact = b"firmware image v1.1.0".to_vec();
        let check = manifest_response(&h.server_keys, &artifact);

        h.mock.set_artifact(artifact);
        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok"); // fw ack response

        h.client.register().await.unwrap();
        let applied = h.client.firmware_update(&check).await.unwrap();

        assert!(applied);
        assert_eq!(h.apply_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.client.current_firmware(), "1.1.0");

        let sent = h.mock.take_requests();
        let ack = sent.iter().find(|r| r.path == FIRMWARE_ACK_PATH).unwrap();
        let tokens = TokenMap::parse(&ack.body);
        assert_eq!(tokens.get("FW1"), Some("fw-2026-08"));
        assert_eq!(tokens.get("ACK1"), Some("OK"));
        assert_eq!(tokens.get("ACK2"), Some("Firmware applied successfully"));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_aborts_before_apply() {
        let mut h = harness(true);
        let check = manifest_response(&h.server_keys, b"expected bytes");

        // The server serves different bytes than the manifest promised.
        h.mock.set_artifact(b"tampered bytes".to_vec());
        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok"); // fw ack response

        h.client.register().await.unwrap();
        let applied = h.client.firmware_update(&check).await.unwrap();

        assert!(!applied);
        // The apply stage was never reached.
        assert_eq!(h.apply_calls.load(Ordering::SeqCst), 0);
        // Local version unchanged.
        assert_eq!(h.client.current_firmware(), "1.0.0");

        // A truthful failure ack still went out.
        let sent = h.mock.take_requests();
        let ack = sent.iter().find(|r| r.path == FIRMWARE_ACK_PATH).unwrap();
        let tokens = TokenMap::parse(&ack.body);
        assert_eq!(tokens.get("ACK1"), Some("ERROR"));
        assert_eq!(tokens.get("ACK2"), Some("Checksum verification failed"));
    }

    #[tokio::test]
    async fn test_invalid_manifest_signature_is_sideeffect_free() {
        let mut h = harness(true);
        let mut check = manifest_response(&h.server_keys, b"artifact");
        // Corrupt a signed field after signing.
        check.insert("FW4", "0000");

        h.mock.queue_response(200, "S1:registered");
        h.client.register().await.unwrap();
        h.mock.take_requests();

        let applied = h.client.firmware_update(&check).await.unwrap();
        assert!(!applied);
        assert_eq!(h.apply_calls.load(Ordering::SeqCst), 0);
        // Nothing crossed the wire: no download, no ack.
        assert_eq!(h.mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_download_failure_acks_error() {
        let mut h = harness(true);
        let check = manifest_response(&h.server_keys, b"artifact");

        h.mock.fail_downloads(true);
        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok"); // fw ack response

        h.client.register().await.unwrap();
        let applied = h.client.firmware_update(&check).await.unwrap();

        assert!(!applied);
        assert_eq!(h.apply_calls.load(Ordering::SeqCst), 0);
        let sent = h.mock.take_requests();
        let ack = sent.iter().find(|r| r.path == FIRMWARE_ACK_PATH).unwrap();
        assert!(ack.body.contains("ACK1:ERROR"));
    }

    #[tokio::test]
    async fn test_forced_apply_failure_keeps_prior_version() {
        let mut h = harness(false);
        let artifact = b"good artifact".to_vec();
        let check = manifest_response(&h.server_keys, &artifact);

        h.mock.set_artifact(artifact);
        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok"); // fw ack response

        h.client.register().await.unwrap();
        let applied = h.client.firmware_update(&check).await.unwrap();

        assert!(!applied);
        assert_eq!(h.apply_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.client.current_firmware(), "1.0.0");

        let sent = h.mock.take_requests();
        let ack = sent.iter().find(|r| r.path == FIRMWARE_ACK_PATH).unwrap();
        let tokens = TokenMap::parse(&ack.body);
        assert_eq!(tokens.get("ACK1"), Some("ERROR"));
        assert_eq!(tokens.get("ACK2"), Some("Apply failed, rolled back"));
    }

    #[test]
    fn test_staged_swap_and_forced_failure() {
        let dir = std::env::temp_dir().join(format!("toon-swap-test-{}", generate_nonce()));
        std::fs::create_dir_all(&dir).unwrap();
        let staged = dir.join("staged.bin");
        let active = dir.join("active/firmware.bin");
        std::fs::write(&staged, b"image").unwrap();

        let swap = StagedSwap::new(active.clone());
        assert!(swap.apply(&staged));
        assert_eq!(std::fs::read(&active).unwrap(), b"image");

        // Missing staged artifact fails cleanly.
        assert!(!swap.apply(&dir.join("missing.bin")));

        assert!(!ForcedFailure.apply(&staged));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
