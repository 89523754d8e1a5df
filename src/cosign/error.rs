use thiserror::Error;

use crate::domain::pubkey::ParseKeyError;
use crate::domain::{Commitment, MessageError, SlotError};
use crate::rpc::RpcError;

/// Failures anywhere in the decode, sign, submit, confirm pipeline.
#[derive(Error, Debug)]
pub enum CoSignError {
    #[error("encoded message is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to decode versioned message")]
    Message(#[from] MessageError),

    #[error("invalid external signature")]
    ExternalSignature(#[source] ParseKeyError),

    #[error("cannot assemble signatures")]
    Slots(#[from] SlotError),

    #[error("no signer slot left for the external signature ({required} required)")]
    NoExternalSlot { required: usize },

    #[error("transaction submission failed")]
    Rpc(#[from] RpcError),

    #[error("simulation failed: {err}")]
    Simulation { err: String, logs: Vec<String> },

    #[error("transaction {signature} failed on chain: {err}")]
    OnChain { signature: String, err: String },

    #[error("status check for transaction {signature} failed")]
    StatusCheck {
        signature: String,
        #[source]
        source: RpcError,
    },

    #[error("transaction {signature} not {commitment} after {attempts} status checks")]
    ConfirmationTimeout {
        signature: String,
        commitment: Commitment,
        attempts: u32,
    },
}

impl CoSignError {
    /// Diagnostic logs from the cluster, if the failure carried any.
    pub fn logs(&self) -> Vec<String> {
        match self {
            CoSignError::Rpc(e) | CoSignError::StatusCheck { source: e, .. } => e.logs().to_vec(),
            CoSignError::Simulation { logs, .. } => logs.clone(),
            _ => Vec::new(),
        }
    }

    /// Signature of a transaction that reached the cluster before failing.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            CoSignError::OnChain { signature, .. }
            | CoSignError::StatusCheck { signature, .. }
            | CoSignError::ConfirmationTimeout { signature, .. } => Some(signature),
            _ => None,
        }
    }
}
