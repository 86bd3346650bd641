// ============================================
// File: crates/toon-agent/src/client.rs
// ============================================
//! # Protocol Client
//!
//! ## Creation Reason
//! Orchestrates the device's protocol life: registration, heartbeats,
//! command polling/acknowledgment, and firmware checks, building signed
//! token messages and exchanging them through the transport.
//!
//! ## State Machine
//! ```text
//! UNREGISTERED ── register() ──► REGISTERED
//!                                    │
//!        ┌───────────────────────────┘
//!        ▼
//!   HEARTBEAT ─► [COMMAND_POLL ─► ack each] ─► [FW_CHECK ─► UPDATE] ─► WAIT
//!        ▲                                                              │
//!        └──────────────────────────────────────────────────────────────┘
//! ```
//! There is no terminal state; the loop runs for the process lifetime
//! and is stopped externally.
//!
//! ## Main Logical Flow (per signed send)
//! 1. Build the typed message (fresh timestamp + nonce)
//! 2. Record the nonce durably - BEFORE the send, so a crash mid-send
//!    cannot lead a retry to reuse it
//! 3. Sign the canonical form, serialize the wire form
//! 4. Audit out, exchange, audit in, parse the response
//!
//! ## ⚠️ Important Note for Next Developer
//! - Registration rejection is fatal and propagates; everything else
//!   folds into the run loop's backoff path
//! - Commands whose server signature does not verify are dropped
//!   silently: never executed, never acknowledged
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol client

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use toon_common::time::{unix_timestamp, wire_timestamp};
use toon_core::token::{
    decode_array, keys, CommandAck, CommandQuery, FirmwareCheck, Heartbeat, Registration,
    TokenMap, TokenMessage,
};
use toon_core::{generate_nonce, sign_tokens, DeviceKeyPair, ServerPublicKey};
use toon_transport::Transport;

use crate::backoff::BackoffController;
use crate::commands::{dispatch, Command};
use crate::config::{AgentConfig, DeviceConfig};
use crate::error::{AgentError, Result};
use crate::firmware::{ApplyStage, StagedSwap};
use crate::storage::{AuditSink, Direction, NonceLedger};
use crate::telemetry::TelemetryProvider;

// ============================================
// Endpoints & status tokens
// ============================================

/// Registration endpoint.
pub const REGISTER_PATH: &str = "/api/devices/register";
/// Heartbeat endpoint.
pub const HEARTBEAT_PATH: &str = "/api/devices/heartbeat";
/// Command poll endpoint (read).
pub const COMMANDS_PATH: &str = "/api/devices/commands";
/// Command acknowledgment endpoint.
pub const COMMAND_ACK_PATH: &str = "/api/devices/command-ack";
/// Firmware check endpoint.
pub const FIRMWARE_CHECK_PATH: &str = "/api/devices/firmware/check";
/// Firmware acknowledgment endpoint.
pub const FIRMWARE_ACK_PATH: &str = "/api/devices/firmware/ack";

/// Status tokens the server may answer a registration with.
pub const ACCEPTED_REGISTRATION_STATUSES: [&str; 2] = ["registered", "ok"];

/// Firmware-check status meaning an update is available.
pub const STATUS_UPDATE_AVAILABLE: &str = "update_available";

// ============================================
// ClientState
// ============================================

/// Protocol state of a device client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Identity exists but the server has not accepted it yet.
    Unregistered,
    /// Registration accepted; the operational loop may run.
    Registered,
}

// ============================================
// DeviceClient
// ============================================

/// The device-side protocol engine.
///
/// One instance per device identity. Strictly sequential: nothing here
/// tolerates concurrent mutation, which is fine because the run loop is
/// the only caller.
pub struct DeviceClient {
    pub(crate) device: DeviceConfig,
    pub(crate) state: ClientState,
    pub(crate) keys: DeviceKeyPair,
    pub(crate) server_key: Option<ServerPublicKey>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) telemetry: Arc<dyn TelemetryProvider>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) nonces: NonceLedger,
    pub(crate) backoff: BackoffController,
    pub(crate) apply_stage: Box<dyn ApplyStage>,
    pub(crate) staging_dir: std::path::PathBuf,
    pub(crate) current_fw: String,
}

impl DeviceClient {
    /// Creates a client from configuration and collaborators.
    ///
    /// # Errors
    /// Returns error if a configured server public key does not decode.
    pub fn new(
        config: &AgentConfig,
        keys: DeviceKeyPair,
        transport: Arc<dyn Transport>,
        telemetry: Arc<dyn TelemetryProvider>,
        audit: Arc<dyn AuditSink>,
        nonces: NonceLedger,
    ) -> Result<Self> {
        let server_key = match &config.server.public_key_b64 {
            Some(b64) => Some(ServerPublicKey::from_base64(b64)?),
            None => {
                warn!("no server public key configured; commands and firmware will be rejected");
                None
            }
        };

        Ok(Self {
            device: config.device.clone(),
            state: ClientState::Unregistered,
            keys,
            server_key,
            transport,
            telemetry,
            audit,
            nonces,
            backoff: BackoffController::new(&config.retry),
            apply_stage: Box::new(StagedSwap::new(config.active_image())),
            staging_dir: config.staging_dir(),
            current_fw: config.device.firmware_version.clone(),
        })
    }

    /// Replaces the firmware apply stage (device-specific or forced
    /// failure for tests).
    #[must_use]
    pub fn with_apply_stage(mut self, stage: Box<dyn ApplyStage>) -> Self {
        self.apply_stage = stage;
        self
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Firmware version the device currently considers active.
    #[must_use]
    pub fn current_firmware(&self) -> &str {
        &self.current_fw
    }

    /// The backoff controller (read access for callers and tests).
    #[must_use]
    pub const fn backoff(&self) -> &BackoffController {
        &self.backoff
    }

    // ========================================
    // Signed exchange plumbing
    // ========================================

    /// Generates a nonce and records it durably before it is used.
    pub(crate) fn fresh_nonce(&mut self) -> Result<String> {
        let nonce = generate_nonce();
        if self.nonces.seen(&nonce) {
            // Locally generated 128-bit values do not collide; a hit
            // here means the RNG is broken, not that a replay happened.
            error!(%nonce, "freshly generated nonce already in ledger");
        }
        self.nonces.record(&nonce)?;
        Ok(nonce)
    }

    /// Signs and sends a message, returning the parsed response tokens.
    pub(crate) async fn exchange(
        &mut self,
        message: &dyn TokenMessage,
        path: &str,
        read: bool,
    ) -> Result<TokenMap> {
        let mut tokens = message.tokens();
        sign_tokens(&self.keys, &mut tokens);
        let wire = tokens.to_wire()?;

        self.audit.record(message.kind(), Direction::Out, &wire);
        let (status, text) = if read {
            self.transport.get(path, &wire).await?
        } else {
            self.transport.post(path, &wire).await?
        };
        self.audit.record(message.kind(), Direction::In, &text);

        debug!(kind = message.kind(), path, status, "exchange complete");
        Ok(TokenMap::parse(&text))
    }

    fn require_registered(&self, operation: &str) -> Result<()> {
        if self.state != ClientState::Registered {
            return Err(AgentError::NotRegistered {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    // ========================================
    // Protocol operations
    // ========================================

    /// Registers the device, binding its public key to its identifier.
    ///
    /// # Errors
    /// A response status outside the accepted set is fatal
    /// ([`AgentError::RegistrationRejected`]); a device that cannot
    /// register has no valid further protocol state, so this is
    /// propagated, not retried here.
    pub async fn register(&mut self) -> Result<()> {
        let message = Registration {
            device_id: self.device.id.clone(),
            device_class: self.device.class.clone(),
            public_key_b64: self.keys.public_key_b64(),
            manufacturer: self.device.manufacturer.clone(),
            model: self.device.model.clone(),
            timestamp: wire_timestamp(),
            nonce: self.fresh_nonce()?,
        };

        let response = self.exchange(&message, REGISTER_PATH, false).await?;
        let status = response.get(keys::STATUS).unwrap_or_default();
        if !ACCEPTED_REGISTRATION_STATUSES.contains(&status) {
            return Err(AgentError::RegistrationRejected {
                status: status.to_string(),
            });
        }

        self.backoff.on_success(response.get_u64(keys::RETRY_AFTER));
        self.state = ClientState::Registered;
        info!(device_id = %self.device.id, "device registered");
        Ok(())
    }

    /// Sends one heartbeat and returns the parsed response.
    ///
    /// A server retry directive on the response updates the backoff
    /// interval (clamped); a quiet success reverts it to the baseline.
    ///
    /// # Errors
    /// Transport failures propagate to the caller's failure path.
    pub async fn heartbeat_once(&mut self) -> Result<TokenMap> {
        self.require_registered("heartbeat")?;

        let message = Heartbeat {
            device_id: self.device.id.clone(),
            heartbeat_id: format!("hb_{}", unix_timestamp()),
            uptime_secs: self.telemetry.uptime_seconds(),
            memory_mb: self.telemetry.memory_used_mb(),
            cpu_temp_c: self.telemetry.cpu_temperature_c(),
            last_boot: self.telemetry.last_boot_iso(),
            network: self.telemetry.network_status().as_str().to_string(),
            firmware: self.current_fw.clone(),
            timestamp: wire_timestamp(),
            nonce: self.fresh_nonce()?,
        };

        let response = self.exchange(&message, HEARTBEAT_PATH, false).await?;
        self.backoff.on_success(response.get_u64(keys::RETRY_AFTER));
        Ok(response)
    }

    /// Polls for pending commands and returns only those whose server
    /// signature verifies.
    ///
    /// Unverifiable commands (bad signature, missing signature, or no
    /// configured server key) are dropped silently - never executed,
    /// never acknowledged.
    ///
    /// # Errors
    /// Transport failures propagate.
    pub async fn commands_poll(&mut self) -> Result<Vec<Command>> {
        self.require_registered("commands_poll")?;

        let message = CommandQuery {
            device_id: self.device.id.clone(),
            timestamp: wire_timestamp(),
            nonce: self.fresh_nonce()?,
        };

        let response = self.exchange(&message, COMMANDS_PATH, true).await?;
        let groups = decode_array(&response, keys::CMD_PREFIX);

        let Some(server_key) = self.server_key else {
            if !groups.is_empty() {
                warn!(
                    dropped = groups.len(),
                    "no server public key configured; dropping all polled commands"
                );
            }
            return Ok(Vec::new());
        };

        let mut verified = Vec::new();
        for fields in groups {
            let command = Command::from_fields(fields);
            if command.verify(&server_key) {
                verified.push(command);
            } else {
                debug!(id = command.id(), "dropping command with unverifiable signature");
            }
        }
        Ok(verified)
    }

    /// Handles one verified command: dispatch, then exactly one
    /// acknowledgment carrying the measured duration.
    ///
    /// # Errors
    /// An acknowledgment transport failure propagates; the ack itself
    /// is never retried here.
    pub async fn handle_command(&mut self, command: &Command) -> Result<()> {
        let started = Instant::now();
        let outcome = dispatch(command);
        let duration_ms = started.elapsed().as_millis() as u64;

        self.command_ack(command.id(), outcome.ok, &outcome.message, duration_ms)
            .await?;
        Ok(())
    }

    /// Sends a signed command acknowledgment.
    ///
    /// # Errors
    /// Transport failures propagate to the caller's error path - they
    /// are not swallowed.
    pub async fn command_ack(
        &mut self,
        command_id: &str,
        ok: bool,
        message_text: &str,
        duration_ms: u64,
    ) -> Result<TokenMap> {
        let message = CommandAck {
            device_id: self.device.id.clone(),
            command_id: command_id.to_string(),
            ok,
            message: message_text.to_string(),
            duration_ms,
            timestamp: wire_timestamp(),
            nonce: self.fresh_nonce()?,
        };
        self.exchange(&message, COMMAND_ACK_PATH, false).await
    }

    /// Queries the server for a firmware update against the current
    /// version. The response status distinguishes `update_available`
    /// from up-to-date.
    ///
    /// # Errors
    /// Transport failures propagate.
    pub async fn firmware_check(&mut self) -> Result<TokenMap> {
        self.require_registered("firmware_check")?;

        let message = FirmwareCheck {
            device_id: self.device.id.clone(),
            firmware: self.current_fw.clone(),
            timestamp: wire_timestamp(),
            nonce: self.fresh_nonce()?,
        };
        self.exchange(&message, FIRMWARE_CHECK_PATH, false).await
    }

    // ========================================
    // Run loop
    // ========================================

    /// One loop iteration: heartbeat, then commands and firmware when
    /// the server signaled them.
    ///
    /// # Errors
    /// The first failing exchange aborts the iteration; the caller
    /// folds it into backoff growth.
    pub async fn iterate(&mut self) -> Result<()> {
        let response = self.heartbeat_once().await?;

        if response.get_u64(keys::PENDING_CMDS).unwrap_or(0) > 0 {
            let commands = self.commands_poll().await?;
            for command in &commands {
                self.handle_command(command).await?;
            }
        }

        if response.get(keys::FW_AVAILABLE) == Some("true")
            || response.contains_key(keys::FW_VERSION)
        {
            let check = self.firmware_check().await?;
            if check.get(keys::STATUS) == Some(STATUS_UPDATE_AVAILABLE) {
                self.firmware_update(&check).await?;
            }
        }

        Ok(())
    }

    /// Runs the protocol loop for the life of the process.
    ///
    /// Registers first if needed (fatal on rejection), then iterates
    /// forever: any iteration failure is audited and doubles the wait;
    /// the loop itself never terminates on error.
    ///
    /// # Errors
    /// Only registration failure (or a nonce ledger write failure
    /// during it) escapes this function.
    pub async fn run(&mut self) -> Result<()> {
        if self.state == ClientState::Unregistered {
            self.register().await?;
        }

        loop {
            if let Err(e) = self.iterate().await {
                warn!(error = %e, "iteration failed");
                self.audit
                    .record("error", Direction::In, &e.to_string());
                self.backoff.on_failure();
            }
            tokio::time::sleep(self.backoff.current()).await;
        }
    }
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("device_id", &self.device.id)
            .field("state", &self.state)
            .field("firmware", &self.current_fw)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use toon_core::token::encode_array;
    use toon_core::verify_with_public_b64;
    use toon_transport::MockTransport;

    use crate::storage::NullAudit;
    use crate::telemetry::StaticTelemetry;

    struct Harness {
        client: DeviceClient,
        mock: Arc<MockTransport>,
        server_keys: DeviceKeyPair,
        data_dir: std::path::PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.data_dir);
        }
    }

    fn harness() -> Harness {
        let data_dir =
            std::env::temp_dir().join(format!("toon-client-test-{}", generate_nonce()));
        std::fs::create_dir_all(&data_dir).unwrap();

        let server_keys = DeviceKeyPair::generate();
        let mut config = AgentConfig::default();
        config.device.id = "pi-test-01".to_string();
        config.paths.data_dir = data_dir.clone();
        config.server.public_key_b64 = Some(server_keys.public_key_b64());

        let mock = Arc::new(MockTransport::new());
        let nonces = NonceLedger::open(config.nonce_file()).unwrap();
        let client = DeviceClient::new(
            &config,
            DeviceKeyPair::generate(),
            mock.clone(),
            Arc::new(StaticTelemetry::default()),
            Arc::new(NullAudit),
            nonces,
        )
        .unwrap();

        Harness {
            client,
            mock,
            server_keys,
            data_dir,
        }
    }

    fn server_signed_command(server_keys: &DeviceKeyPair, id: &str, kind: &str) -> TokenMap {
        let mut fields = TokenMap::new();
        fields.insert("CMD1", id);
        fields.insert("CMD2", kind);
        fields.insert("TS", "2026-08-06T12:00:00.000Z");
        let signature = server_keys.sign_b64(&fields.canonical_bytes());
        fields.insert("SIG_SERV", signature);
        fields
    }

    #[tokio::test]
    async fn test_register_happy_path() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:registered");

        h.client.register().await.unwrap();
        assert_eq!(h.client.state(), ClientState::Registered);

        let sent = h.mock.take_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].path, REGISTER_PATH);

        // The registration payload carries the device public key and a
        // valid self-signature.
        let tokens = TokenMap::parse(&sent[0].body);
        assert_eq!(tokens.get("D1"), Some("pi-test-01"));
        assert_eq!(
            tokens.get("D3"),
            Some(h.client.keys.public_key_b64().as_str())
        );
        let sig = tokens.get("SIG1").unwrap();
        assert!(verify_with_public_b64(
            &h.client.keys.public_key_b64(),
            &tokens.canonical_bytes(),
            sig,
        ));
    }

    #[tokio::test]
    async fn test_register_rejection_is_fatal() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:denied");

        let err = h.client.register().await.unwrap_err();
        assert!(matches!(err, AgentError::RegistrationRejected { .. }));
        assert!(err.is_fatal());
        assert_eq!(h.client.state(), ClientState::Unregistered);
    }

    #[tokio::test]
    async fn test_register_applies_retry_directive() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:registered|RTO:120");

        h.client.register().await.unwrap();
        assert_eq!(h.client.backoff().current(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_heartbeat_requires_registration() {
        let mut h = harness();
        let err = h.client.heartbeat_once().await.unwrap_err();
        assert!(matches!(err, AgentError::NotRegistered { .. }));
        assert_eq!(h.mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_heartbeat_records_nonce_before_send() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok");

        h.client.register().await.unwrap();
        h.client.heartbeat_once().await.unwrap();

        let sent = h.mock.take_requests();
        let hb = TokenMap::parse(&sent[1].body);
        let nonce = hb.get("NONCE").unwrap();
        assert_eq!(nonce.len(), 32);
        assert!(h.client.nonces.seen(nonce));
        // Telemetry values flowed into the signed payload.
        assert_eq!(hb.get("HB2"), Some("86400"));
        assert_eq!(hb.get("HB6"), Some("ONLINE"));
    }

    #[tokio::test]
    async fn test_heartbeat_rto_clamped() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:slow_down|RTO:100000");

        h.client.register().await.unwrap();
        h.client.heartbeat_once().await.unwrap();
        assert_eq!(h.client.backoff().current(), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_happy_path_iteration_sleeps_baseline() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:registered");
        // No pending commands, no firmware signal.
        h.mock.queue_response(200, "S1:ok|PENDING_CMDS:0");

        h.client.register().await.unwrap();
        h.client.iterate().await.unwrap();

        // Only register + heartbeat crossed the wire.
        assert_eq!(h.mock.take_requests().len(), 2);
        assert_eq!(h.client.backoff().current(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_verified_command_produces_exactly_one_ack() {
        let mut h = harness();
        let command = server_signed_command(&h.server_keys, "c-7", "RESTART");
        let poll_body = encode_array(&[command], "CMD").to_wire().unwrap();

        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok|PENDING_CMDS:1");
        h.mock.queue_response(200, &poll_body);
        h.mock.queue_response(200, "S1:ok"); // ack response

        h.client.register().await.unwrap();
        h.client.iterate().await.unwrap();

        let sent = h.mock.take_requests();
        let acks: Vec<_> = sent
            .iter()
            .filter(|r| r.path == COMMAND_ACK_PATH)
            .collect();
        assert_eq!(acks.len(), 1);

        let ack = TokenMap::parse(&acks[0].body);
        assert_eq!(ack.get("CMD1"), Some("c-7"));
        assert_eq!(ack.get("ACK1"), Some("OK"));
        assert_eq!(ack.get("ACK2"), Some("Restart simulated"));
        // Duration is measured, present, and numeric.
        assert!(ack.get_u64("ACK3").is_some());
    }

    #[tokio::test]
    async fn test_corrupted_command_signature_never_acked() {
        let mut h = harness();
        let mut command = server_signed_command(&h.server_keys, "c-8", "RESTART");
        // Corrupt a signed field after the server signed it.
        command.insert("CMD2", "FETCH_LOGS");
        let poll_body = encode_array(&[command], "CMD").to_wire().unwrap();

        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok|PENDING_CMDS:1");
        h.mock.queue_response(200, &poll_body);
        // Deliberately no ack response queued: an ack attempt would fail
        // the iteration.

        h.client.register().await.unwrap();
        h.client.iterate().await.unwrap();

        let sent = h.mock.take_requests();
        assert!(sent.iter().all(|r| r.path != COMMAND_ACK_PATH));
    }

    #[tokio::test]
    async fn test_unsupported_command_acked_as_error() {
        let mut h = harness();
        let command = server_signed_command(&h.server_keys, "c-9", "SELF_DESTRUCT");
        let poll_body = encode_array(&[command], "CMD").to_wire().unwrap();

        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok|PENDING_CMDS:1");
        h.mock.queue_response(200, &poll_body);
        h.mock.queue_response(200, "S1:ok");

        h.client.register().await.unwrap();
        h.client.iterate().await.unwrap();

        let sent = h.mock.take_requests();
        let ack = sent.iter().find(|r| r.path == COMMAND_ACK_PATH).unwrap();
        let tokens = TokenMap::parse(&ack.body);
        assert_eq!(tokens.get("ACK1"), Some("ERROR"));
        assert!(tokens.get("ACK2").unwrap().contains("unsupported command"));
    }

    #[tokio::test]
    async fn test_commands_poll_without_server_key_drops_everything() {
        let h = harness();
        // Rebuild the client without a configured server key.
        let data_dir =
            std::env::temp_dir().join(format!("toon-client-nokey-{}", generate_nonce()));
        let mut config = AgentConfig::default();
        config.device.id = "pi-test-02".to_string();
        config.paths.data_dir = data_dir.clone();
        let mock = Arc::new(MockTransport::new());
        let mut client = DeviceClient::new(
            &config,
            DeviceKeyPair::generate(),
            mock.clone(),
            Arc::new(StaticTelemetry::default()),
            Arc::new(NullAudit),
            NonceLedger::open(config.nonce_file()).unwrap(),
        )
        .unwrap();

        let command = server_signed_command(&h.server_keys, "c-10", "RESTART");
        let poll_body = encode_array(&[command], "CMD").to_wire().unwrap();
        mock.queue_response(200, "S1:registered");
        mock.queue_response(200, &poll_body);

        client.register().await.unwrap();
        let verified = client.commands_poll().await.unwrap();
        assert!(verified.is_empty());

        let _ = std::fs::remove_dir_all(&data_dir);
    }

    #[tokio::test]
    async fn test_firmware_up_to_date_skips_pipeline() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:registered");
        h.mock.queue_response(200, "S1:ok|FW_AVAILABLE:true");
        h.mock.queue_response(200, "S1:up_to_date");

        h.client.register().await.unwrap();
        h.client.iterate().await.unwrap();

        let sent = h.mock.take_requests();
        // register, heartbeat, firmware check - and nothing more.
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].path, FIRMWARE_CHECK_PATH);
        assert_eq!(h.client.current_firmware(), "1.0.0");
    }

    #[tokio::test]
    async fn test_iteration_failure_grows_backoff() {
        let mut h = harness();
        h.mock.queue_response(200, "S1:registered");
        // No heartbeat response queued: the exchange fails like a dead
        // network.

        h.client.register().await.unwrap();
        assert!(h.client.iterate().await.is_err());
        h.client.backoff.on_failure();
        assert_eq!(h.client.backoff().current(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_post_sign_tamper_is_only_detectable_by_server() {
        let h = harness();

        // Build and sign a heartbeat payload, then alter a covered
        // field after signing.
        let mut tokens = Heartbeat {
            device_id: "pi-test-01".into(),
            heartbeat_id: "hb_1".into(),
            uptime_secs: 10,
            memory_mb: 100,
            cpu_temp_c: 40.0,
            last_boot: "2026-08-05T12:00:00Z".into(),
            network: "ONLINE".into(),
            firmware: "1.0.0".into(),
            timestamp: "2026-08-06T12:00:00.000Z".into(),
            nonce: "aa".into(),
        }
        .tokens();
        sign_tokens(&h.client.keys, &mut tokens);
        tokens.insert("HB2", "99999");

        // The device's own key no longer verifies the payload...
        let sig = tokens.get("SIG1").unwrap();
        assert!(!verify_with_public_b64(
            &h.client.keys.public_key_b64(),
            &tokens.canonical_bytes(),
            sig,
        ));

        // ...but the local send path has no way to detect or prevent
        // the send; rejection is the server's guarantee.
        h.mock.queue_response(200, "S1:ok");
        let wire = tokens.to_wire().unwrap();
        let (status, _) = h.mock.post(HEARTBEAT_PATH, &wire).await.unwrap();
        assert_eq!(status, 200);
    }
}
