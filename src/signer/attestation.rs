use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::pubkey::{PUBKEY_BYTES, SIGNATURE_BYTES};
use crate::domain::{Pubkey, RuleKind, Signature};

use super::keys::{verify_signature, ServiceSigner};

/// Ed25519SigVerify111111111111111111111111111
pub const ED25519_PROGRAM_ID: Pubkey = Pubkey::new([
    3, 125, 70, 214, 124, 147, 251, 190, 18, 249, 66, 143, 131, 141, 64, 255, 5, 112, 116, 73,
    39, 244, 138, 100, 252, 202, 112, 68, 128, 0, 0, 0,
]);

/// Offsets table size for one signature.
const SIGNATURE_OFFSETS_LEN: usize = 14;
/// Signature count byte plus padding byte.
const OFFSETS_START: usize = 2;
/// Instruction index meaning "this instruction".
const CURRENT_INSTRUCTION: u16 = u16::MAX;

/// Attestation construction errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttestationError {
    #[error("attested message is {len} bytes, the verify instruction allows at most 65535")]
    MessageTooLong { len: usize },
}

/// Account reference of a ledger instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Uncompiled ledger instruction ready for a client to add to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerInstruction {
    pub keys: Vec<AccountMeta>,
    pub program_id: Pubkey,
    pub data: Vec<u8>,
}

/// Signed attestation that a rule passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub instruction: LedgerInstruction,
    pub message: String,
    pub signature: Signature,
}

/// Build a native Ed25519 signature-verify instruction carrying its own
/// public key, signature and message.
pub fn ed25519_verify_instruction(
    pubkey: &Pubkey,
    message: &[u8],
    signature: &Signature,
) -> Result<LedgerInstruction, AttestationError> {
    const PUBLIC_KEY_OFFSET: u16 = (OFFSETS_START + SIGNATURE_OFFSETS_LEN) as u16;
    const SIGNATURE_OFFSET: u16 = PUBLIC_KEY_OFFSET + PUBKEY_BYTES as u16;
    const MESSAGE_OFFSET: u16 = SIGNATURE_OFFSET + SIGNATURE_BYTES as u16;

    let message_size = u16::try_from(message.len())
        .map_err(|_| AttestationError::MessageTooLong { len: message.len() })?;

    let mut data = Vec::with_capacity(MESSAGE_OFFSET as usize + message.len());
    data.push(1u8);
    data.push(0u8);

    for value in [
        SIGNATURE_OFFSET,
        CURRENT_INSTRUCTION,
        PUBLIC_KEY_OFFSET,
        CURRENT_INSTRUCTION,
        MESSAGE_OFFSET,
        message_size,
        CURRENT_INSTRUCTION,
    ] {
        data.extend_from_slice(&value.to_le_bytes());
    }

    data.extend_from_slice(pubkey.as_bytes());
    data.extend_from_slice(signature.as_bytes());
    data.extend_from_slice(message);

    Ok(LedgerInstruction {
        keys: Vec::new(),
        program_id: ED25519_PROGRAM_ID,
        data,
    })
}

/// Produces portable attestations for rules that passed evaluation.
#[derive(Debug, Clone)]
pub struct AttestationSigner {
    signer: Arc<ServiceSigner>,
}

impl AttestationSigner {
    pub fn new(signer: Arc<ServiceSigner>) -> Self {
        AttestationSigner { signer }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    /// The message attested for `kind`.
    ///
    /// Known kinds map to their short code; kinds without one attest the
    /// caller's message verbatim.
    pub fn canonical_message(fallback: &str, kind: &RuleKind) -> String {
        kind.short_code()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Sign the canonical message for `kind` and wrap it in a verify instruction.
    pub fn attest(&self, fallback: &str, kind: &RuleKind) -> Result<Attestation, AttestationError> {
        let message = Self::canonical_message(fallback, kind);
        let signature = self.signer.sign(message.as_bytes());
        let instruction =
            ed25519_verify_instruction(&self.signer.pubkey(), message.as_bytes(), &signature)?;

        debug!(rule_kind = %kind, message = %message, "attestation signed");

        Ok(Attestation {
            instruction,
            message,
            signature,
        })
    }
}

/// Check an attestation signature given in base58 against a base58 public key.
pub fn verify_attestation(message: &str, signature: &str, pubkey: &str) -> bool {
    let (Ok(signature), Ok(pubkey)) = (signature.parse::<Signature>(), pubkey.parse::<Pubkey>())
    else {
        return false;
    };
    verify_signature(message.as_bytes(), &signature, &pubkey)
}
