//! Transaction co-signing.
//!
//! Every operation walks `RECEIVED -> DECODED -> SIGNED -> [BROADCAST] ->
//! CONFIRMED | FAILED` and returns a [`TransactionResult`]; errors never
//! escape as `Err`.

pub mod confirm;
pub mod error;
pub mod options;

pub use confirm::await_confirmation;
pub use error::CoSignError;
pub use options::{CoSignSettings, ConfirmPolicy, SubmitOptions};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::transaction::inspect_wire_transaction;
use crate::domain::{
    Confirmation, FormatReport, Network, Pubkey, RuleKind, Signature, SignatureSlots,
    SignedTransaction, TransactionResult, VersionedMessage,
};
use crate::rpc::{ClusterConnector, RpcClient};
use crate::signer::ServiceSigner;

/// A decoded message together with the service signature over its canonical bytes.
#[derive(Debug)]
struct SignedMessage {
    message: VersionedMessage,
    message_bytes: Vec<u8>,
    signature: Signature,
}

/// Outcome of a broadcast.
#[derive(Debug)]
struct Submission {
    transaction_id: String,
    confirmation: Option<Confirmation>,
}

/// Signs externally built messages with the service key and optionally broadcasts them.
pub struct TransactionCoSigner {
    signer: Arc<ServiceSigner>,
    clusters: Arc<dyn ClusterConnector>,
    settings: CoSignSettings,
}

impl TransactionCoSigner {
    pub fn new(
        signer: Arc<ServiceSigner>,
        clusters: Arc<dyn ClusterConnector>,
        settings: CoSignSettings,
    ) -> Self {
        TransactionCoSigner {
            signer,
            clusters,
            settings,
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn settings(&self) -> &CoSignSettings {
        &self.settings
    }

    /// Decode and sign a base64 message. `rule_kind` is echoed, not enforced.
    pub fn process_message(&self, encoded: &str, rule_kind: Option<RuleKind>) -> TransactionResult {
        debug!(rule_kind = ?rule_kind, "message received");

        match self.sign_encoded(encoded) {
            Ok(signed) => {
                TransactionResult::signed(&self.pubkey(), signed.signature.to_string(), &signed.message)
                    .with_rule_kind(rule_kind)
            }
            Err(e) => self.failure(e).with_rule_kind(rule_kind),
        }
    }

    /// Sign into the service slot of a zero-filled signature array.
    ///
    /// Returns the partially signed transaction for other signers to complete,
    /// unless `broadcast_on_co_sign` is set, in which case it is submitted.
    pub async fn process_and_co_sign(
        &self,
        encoded: &str,
        rule_kind: Option<RuleKind>,
        network: Network,
        options: SubmitOptions,
    ) -> TransactionResult {
        debug!(rule_kind = ?rule_kind, %network, "co-sign received");

        let result = match self.sign_encoded(encoded) {
            Ok(signed) => self.co_sign(signed, network, options).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(result) => result.with_rule_kind(rule_kind),
            Err(e) => self.failure(e).with_rule_kind(rule_kind),
        }
    }

    /// Merge an external signature with the service signature and submit.
    pub async fn co_sign_and_submit(
        &self,
        encoded: &str,
        external_signature: &str,
        network: Network,
        options: SubmitOptions,
    ) -> TransactionResult {
        debug!(%network, "co-sign and submit received");

        match self
            .co_sign_external(encoded, external_signature, network, options)
            .await
        {
            Ok(result) => result,
            Err(e) => self.failure(e),
        }
    }

    /// Sign as the only service signer, optionally simulate, submit, optionally confirm.
    pub async fn sign_and_submit_versioned_message(
        &self,
        encoded: &str,
        network: Network,
        options: SubmitOptions,
    ) -> TransactionResult {
        debug!(%network, simulate = options.simulate_first, "sign and submit received");

        let result = match self.sign_encoded(encoded) {
            Ok(signed) => self.sign_and_submit(signed, network, options).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(result) => result,
            Err(e) => self.failure(e),
        }
    }

    /// Check a base64 wire transaction's layout without signing it.
    pub fn validate_transaction_format(&self, encoded: &str) -> FormatReport {
        let checked = STANDARD
            .decode(encoded.trim())
            .map_err(CoSignError::from)
            .and_then(|bytes| inspect_wire_transaction(&bytes).map_err(CoSignError::from));

        match checked {
            Ok(summary) => FormatReport {
                valid: true,
                instruction_count: Some(summary.instruction_count),
                signature_count: Some(summary.signature_count),
                error: None,
            },
            Err(e) => {
                debug!(error = %e, "transaction format rejected");
                FormatReport {
                    valid: false,
                    instruction_count: None,
                    signature_count: None,
                    error: Some(crate::domain::result::error_chain(&e)),
                }
            }
        }
    }

    fn sign_encoded(&self, encoded: &str) -> Result<SignedMessage, CoSignError> {
        let raw = STANDARD.decode(encoded.trim())?;
        let message = VersionedMessage::deserialize(&raw)?;
        debug!(
            version = ?message.version,
            signers = message.required_signatures(),
            instructions = message.compiled_instructions.len(),
            "message decoded"
        );

        let message_bytes = message.serialize()?;
        let signature = self.signer.sign(&message_bytes);
        debug!(signature = %signature, "message signed");

        Ok(SignedMessage {
            message,
            message_bytes,
            signature,
        })
    }

    /// Zero-filled slots with the service signature in the service slot.
    fn service_slots(&self, signed: &SignedMessage) -> Result<SignatureSlots, CoSignError> {
        let slot = self.settings.service_slot;
        let mut slots = SignatureSlots::for_message(&signed.message)?;

        let pubkey = self.pubkey();
        if signed.message.signer_keys().get(slot.index()) != Some(&pubkey) {
            warn!(
                slot = slot.index(),
                service = %pubkey,
                "service key is not the signer for its slot"
            );
        }

        slots.place(slot, signed.signature)?;
        Ok(slots)
    }

    async fn co_sign(
        &self,
        signed: SignedMessage,
        network: Network,
        options: SubmitOptions,
    ) -> Result<TransactionResult, CoSignError> {
        let slots = self.service_slots(&signed)?;

        if self.settings.broadcast_on_co_sign {
            return self.broadcast(signed, slots, network, options).await;
        }

        let tx = SignedTransaction::new(slots, signed.message_bytes);
        let mut result =
            TransactionResult::signed(&self.pubkey(), signed.signature.to_string(), &signed.message);
        result.signature_slots = Some(tx.signatures.to_text());
        result.encoded_transaction = Some(STANDARD.encode(tx.to_wire()));

        info!(
            filled = tx.signatures.filled(),
            required = tx.signatures.len(),
            "transaction co-signed"
        );
        Ok(result)
    }

    async fn co_sign_external(
        &self,
        encoded: &str,
        external_signature: &str,
        network: Network,
        options: SubmitOptions,
    ) -> Result<TransactionResult, CoSignError> {
        let external =
            Signature::from_text(external_signature).map_err(CoSignError::ExternalSignature)?;
        let signed = self.sign_encoded(encoded)?;
        let mut slots = self.service_slots(&signed)?;

        let service = self.settings.service_slot;
        let slot = match SignatureSlots::matching_slot(&signed.message, &signed.message_bytes, &external)
        {
            Some(slot) if slot != service => slot,
            _ => {
                let fallback = slots
                    .first_unfilled_except(service)
                    .ok_or(CoSignError::NoExternalSlot {
                        required: slots.len(),
                    })?;
                warn!(
                    slot = fallback.index(),
                    "external signature does not verify against any other signer, using first open slot"
                );
                fallback
            }
        };
        slots.place(slot, external)?;
        debug!(slot = slot.index(), "external signature placed");

        self.broadcast(signed, slots, network, options).await
    }

    async fn sign_and_submit(
        &self,
        signed: SignedMessage,
        network: Network,
        options: SubmitOptions,
    ) -> Result<TransactionResult, CoSignError> {
        let slots = self.service_slots(&signed)?;
        self.broadcast(signed, slots, network, options).await
    }

    async fn broadcast(
        &self,
        signed: SignedMessage,
        slots: SignatureSlots,
        network: Network,
        options: SubmitOptions,
    ) -> Result<TransactionResult, CoSignError> {
        let tx = SignedTransaction::new(slots, signed.message_bytes);
        let rpc = self.clusters.connect(network);
        let submission = self.submit(rpc.as_ref(), &tx, network, &options).await?;

        let mut result =
            TransactionResult::signed(&self.pubkey(), signed.signature.to_string(), &signed.message);
        result.signature_slots = Some(tx.signatures.to_text());
        result.transaction_id = Some(submission.transaction_id);
        result.confirmation = submission.confirmation;
        Ok(result)
    }

    async fn submit(
        &self,
        rpc: &dyn RpcClient,
        tx: &SignedTransaction,
        network: Network,
        options: &SubmitOptions,
    ) -> Result<Submission, CoSignError> {
        let wire = tx.to_wire();

        if options.simulate_first {
            let outcome = rpc
                .simulate_transaction(&wire, options.preflight_commitment)
                .await?;
            if let Some(err) = outcome.err {
                return Err(CoSignError::Simulation {
                    err: err.to_string(),
                    logs: outcome.logs.unwrap_or_default(),
                });
            }
            debug!(units = ?outcome.units_consumed, "simulation passed");
        }

        let transaction_id = rpc.send_transaction(&wire, &options.send_config()).await?;
        info!(%network, transaction_id = %transaction_id, "transaction broadcast");
        let expected = tx.id().map(Signature::to_string);
        if expected.as_deref() != Some(transaction_id.as_str()) {
            warn!(
                transaction_id = %transaction_id,
                expected = ?expected,
                "node returned an id other than the fee payer signature"
            );
        }

        let confirmation = if options.wait_for_confirmation {
            let confirmation = await_confirmation(
                rpc,
                &transaction_id,
                options.commitment,
                &self.settings.confirm,
            )
            .await?;
            info!(
                transaction_id = %transaction_id,
                commitment = %confirmation.commitment,
                slot = confirmation.slot,
                "transaction confirmed"
            );
            Some(confirmation)
        } else {
            None
        };

        Ok(Submission {
            transaction_id,
            confirmation,
        })
    }

    fn failure(&self, err: CoSignError) -> TransactionResult {
        warn!(error = %err, "co-sign failed");

        let mut result = TransactionResult::failure(&self.pubkey(), &err);
        let logs = err.logs();
        if !logs.is_empty() {
            result.logs = Some(logs);
        }
        result.transaction_id = err.transaction_id().map(str::to_string);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::fixtures::message_with_signers;
    use crate::domain::message::MessageVersion;
    use crate::domain::Commitment;
    use crate::rpc::mock::SendBehavior;
    use crate::rpc::{MockRpc, SimulationOutcome};
    use crate::signer::keys::verify_signature;
    use std::time::Duration;

    fn service() -> Arc<ServiceSigner> {
        Arc::new(ServiceSigner::from_seed(&[7u8; 32]))
    }

    fn cosigner(rpc: &MockRpc, settings: CoSignSettings) -> TransactionCoSigner {
        TransactionCoSigner::new(service(), Arc::new(rpc.clone()), settings)
    }

    fn fast_settings() -> CoSignSettings {
        CoSignSettings {
            confirm: ConfirmPolicy {
                poll_interval: Duration::from_millis(1),
                max_attempts: 5,
            },
            ..Default::default()
        }
    }

    fn encoded(signers: &[Pubkey], version: MessageVersion) -> (String, VersionedMessage) {
        let msg = message_with_signers(signers, version);
        (STANDARD.encode(msg.serialize().unwrap()), msg)
    }

    #[test]
    fn test_process_message_signs() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, msg) = encoded(&[cosigner.pubkey()], MessageVersion::Legacy);

        let result = cosigner.process_message(&b64, Some(RuleKind::Followers));

        assert!(result.success);
        assert_eq!(result.public_key, cosigner.pubkey().to_string());
        assert_eq!(result.rule_kind, Some(RuleKind::Followers));

        let sig: Signature = result.signature.unwrap().parse().unwrap();
        assert!(verify_signature(&msg.serialize().unwrap(), &sig, &cosigner.pubkey()));
        assert_eq!(
            result.message_info.unwrap().static_account_keys[0],
            cosigner.pubkey()
        );
    }

    #[test]
    fn test_process_message_rejects_bad_base64() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());

        let result = cosigner.process_message("not base64!!", None);

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("encoded message is not valid base64"));
        assert!(result.stack.unwrap().contains("caused by"));
        assert!(result.signature.is_none());
    }

    #[test]
    fn test_process_message_rejects_truncated_message() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());

        let result = cosigner.process_message(&STANDARD.encode([1u8, 0, 1, 2]), None);

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("failed to decode versioned message"));
    }

    #[tokio::test]
    async fn test_co_sign_fills_service_slot_only() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(
            &[cosigner.pubkey(), Pubkey::new([2; 32]), Pubkey::new([3; 32])],
            MessageVersion::V0,
        );

        let result = cosigner
            .process_and_co_sign(&b64, None, Network::Devnet, SubmitOptions::default())
            .await;

        assert!(result.success);
        let slots = result.signature_slots.unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(Some(&slots[0]), result.signature.as_ref());
        let placeholder = Signature::placeholder().to_string();
        assert_eq!(slots[1], placeholder);
        assert_eq!(slots[2], placeholder);

        let wire = STANDARD.decode(result.encoded_transaction.unwrap()).unwrap();
        let summary = inspect_wire_transaction(&wire).unwrap();
        assert_eq!(summary.signature_count, 3);

        assert!(rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_co_sign_broadcasts_when_configured() {
        let rpc = MockRpc::new();
        let settings = CoSignSettings {
            broadcast_on_co_sign: true,
            ..fast_settings()
        };
        let cosigner = cosigner(&rpc, settings);
        let (b64, _) = encoded(&[cosigner.pubkey()], MessageVersion::Legacy);

        let result = cosigner
            .process_and_co_sign(&b64, Some(RuleKind::Post), Network::Testnet, SubmitOptions::default())
            .await;

        assert!(result.success);
        assert_eq!(result.transaction_id, result.signature);
        assert_eq!(rpc.sent().len(), 1);
        assert_eq!(rpc.networks(), vec![Network::Testnet]);
    }

    #[tokio::test]
    async fn test_co_sign_and_submit_places_external_by_key() {
        use ed25519_dalek::{Signer, SigningKey};

        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let (b64, msg) = encoded(
            &[
                cosigner.pubkey(),
                Pubkey::new([2; 32]),
                Pubkey::new(other.verifying_key().to_bytes()),
            ],
            MessageVersion::Legacy,
        );
        let external = Signature::from(other.sign(&msg.serialize().unwrap()));

        let result = cosigner
            .co_sign_and_submit(&b64, &external.to_string(), Network::MainnetBeta, SubmitOptions::default())
            .await;

        assert!(result.success, "{:?}", result.error);
        let slots = result.signature_slots.unwrap();
        assert_eq!(slots[2], external.to_string());
        assert_eq!(slots[1], Signature::placeholder().to_string());
        assert_eq!(result.confirmation.unwrap().commitment, Commitment::Confirmed);

        let (wire, config) = rpc.sent().remove(0);
        assert_eq!(config.max_retries, Some(3));
        let service_sig = service().sign(&msg.serialize().unwrap());
        assert_eq!(&wire[1..65], &service_sig.as_bytes()[..]);
    }

    #[tokio::test]
    async fn test_co_sign_and_submit_falls_back_to_open_slot() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey(), Pubkey::new([2; 32])], MessageVersion::V0);
        let external = Signature::new([4; 64]);

        let options = SubmitOptions {
            wait_for_confirmation: false,
            ..Default::default()
        };
        let result = cosigner
            .co_sign_and_submit(&b64, &STANDARD.encode(external.as_bytes()), Network::Devnet, options)
            .await;

        assert!(result.success);
        assert_eq!(result.signature_slots.unwrap()[1], external.to_string());
        assert!(result.confirmation.is_none());
        assert_eq!(rpc.status_polls(), 0);
    }

    #[tokio::test]
    async fn test_co_sign_and_submit_without_open_slot() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey()], MessageVersion::Legacy);

        let result = cosigner
            .co_sign_and_submit(&b64, &Signature::new([4; 64]).to_string(), Network::Devnet, SubmitOptions::default())
            .await;

        assert!(!result.success);
        assert!(rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_co_sign_and_submit_rejects_bad_external_signature() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey(), Pubkey::new([2; 32])], MessageVersion::Legacy);

        let result = cosigner
            .co_sign_and_submit(&b64, "short", Network::Devnet, SubmitOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("invalid external signature"));
    }

    #[tokio::test]
    async fn test_submit_rejection_surfaces_logs() {
        crate::observability::tracing::init_test_tracing();
        let rpc = MockRpc::new();
        rpc.set_send(SendBehavior::Reject {
            code: -32002,
            message: "Transaction simulation failed".into(),
            logs: vec!["Program log: Error: insufficient funds".into()],
        });
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey()], MessageVersion::V0);

        let result = cosigner
            .sign_and_submit_versioned_message(&b64, Network::MainnetBeta, SubmitOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("transaction submission failed"));
        assert_eq!(
            result.logs,
            Some(vec!["Program log: Error: insufficient funds".to_string()])
        );
        assert!(result.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_simulation_failure_stops_submission() {
        let rpc = MockRpc::new();
        rpc.set_simulation(SimulationOutcome {
            err: Some(serde_json::json!("AccountNotFound")),
            logs: Some(vec!["Program 11111111111111111111111111111111 failed".into()]),
            units_consumed: None,
        });
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey()], MessageVersion::Legacy);

        let options = SubmitOptions {
            simulate_first: true,
            ..Default::default()
        };
        let result = cosigner
            .sign_and_submit_versioned_message(&b64, Network::Devnet, options)
            .await;

        assert!(!result.success);
        assert_eq!(rpc.simulated(), 1);
        assert!(rpc.sent().is_empty());
        assert_eq!(result.logs.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sign_and_submit_confirms() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey()], MessageVersion::V0);

        let options = SubmitOptions {
            simulate_first: true,
            ..Default::default()
        };
        let result = cosigner
            .sign_and_submit_versioned_message(&b64, Network::Localnet, options)
            .await;

        assert!(result.success);
        assert_eq!(result.transaction_id, result.signature);
        assert_eq!(result.confirmation.unwrap().slot, 1);
        assert_eq!(rpc.simulated(), 1);
        assert_eq!(rpc.networks(), vec![Network::Localnet]);
    }

    #[tokio::test]
    async fn test_confirmation_timeout_keeps_transaction_id() {
        let rpc = MockRpc::new();
        rpc.set_default_status(None);
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey()], MessageVersion::Legacy);

        let result = cosigner
            .sign_and_submit_versioned_message(&b64, Network::Devnet, SubmitOptions::default())
            .await;

        assert!(!result.success);
        assert!(result.transaction_id.is_some());
        assert!(result.error.unwrap().contains("not confirmed after 5 status checks"));
        assert_eq!(rpc.status_polls(), 5);
    }

    #[tokio::test]
    async fn test_status_check_failure_keeps_transaction_id() {
        let rpc = MockRpc::new();
        rpc.fail_status_polls(503);
        let cosigner = cosigner(&rpc, fast_settings());
        let (b64, _) = encoded(&[cosigner.pubkey()], MessageVersion::V0);

        let result = cosigner
            .sign_and_submit_versioned_message(&b64, Network::Devnet, SubmitOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(rpc.sent().len(), 1);
        let id = result.transaction_id.expect("broadcast id kept");
        assert_eq!(
            result.error,
            Some(format!("status check for transaction {id} failed"))
        );
    }

    #[test]
    fn test_validate_transaction_format() {
        let rpc = MockRpc::new();
        let cosigner = cosigner(&rpc, fast_settings());
        let msg = message_with_signers(&[Pubkey::new([1; 32]), Pubkey::new([2; 32])], MessageVersion::V0);
        let mut wire = vec![2u8];
        wire.extend_from_slice(&[0u8; 128]);
        wire.extend_from_slice(&msg.serialize().unwrap());

        let report = cosigner.validate_transaction_format(&STANDARD.encode(&wire));
        assert!(report.valid);
        assert_eq!(report.signature_count, Some(2));
        assert_eq!(report.instruction_count, Some(1));

        wire.push(0);
        let report = cosigner.validate_transaction_format(&STANDARD.encode(&wire));
        assert!(!report.valid);
        assert!(report.error.is_some());
    }
}
