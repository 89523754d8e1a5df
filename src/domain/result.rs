use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use super::cluster::Commitment;
use super::message::{MessageHeader, MessageVersion, VersionedMessage};
use super::pubkey::Pubkey;
use super::rule::RuleKind;

/// Instruction as exposed for audit, with data in base64.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstructionInfo {
    pub program_id_index: u8,
    pub account_key_indexes: Vec<u8>,
    pub data: String,
}

/// Lookup table reference as exposed for audit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LookupInfo {
    pub account_key: Pubkey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// Decoded message contents returned to the caller for inspection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub version: MessageVersion,
    pub header: MessageHeader,
    pub static_account_keys: Vec<Pubkey>,
    pub recent_blockhash: Pubkey,
    pub compiled_instructions: Vec<InstructionInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address_table_lookups: Vec<LookupInfo>,
}

impl From<&VersionedMessage> for MessageInfo {
    fn from(msg: &VersionedMessage) -> Self {
        MessageInfo {
            version: msg.version,
            header: msg.header,
            static_account_keys: msg.static_account_keys.clone(),
            recent_blockhash: msg.recent_blockhash,
            compiled_instructions: msg
                .compiled_instructions
                .iter()
                .map(|ix| InstructionInfo {
                    program_id_index: ix.program_id_index,
                    account_key_indexes: ix.account_key_indexes.clone(),
                    data: STANDARD.encode(&ix.data),
                })
                .collect(),
            address_table_lookups: msg
                .address_table_lookups
                .iter()
                .map(|l| LookupInfo {
                    account_key: l.account_key,
                    writable_indexes: l.writable_indexes.clone(),
                    readonly_indexes: l.readonly_indexes.clone(),
                })
                .collect(),
        }
    }
}

/// Confirmation reached for a submitted transaction.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub commitment: Commitment,
    pub slot: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

/// Outcome of every co-signing operation.
///
/// Failures are values, never panics: `success` is false and `error`,
/// `stack` and (when the cluster supplied them) `logs` describe why.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub success: bool,

    pub public_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_kind: Option<RuleKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_info: Option<MessageInfo>,

    /// Base58 text of each signer slot, in slot order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_slots: Option<Vec<String>>,

    /// Base64 wire transaction with the slots applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_transaction: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

impl TransactionResult {
    /// Successful signing of `message`.
    pub fn signed(public_key: &Pubkey, signature: String, message: &VersionedMessage) -> Self {
        TransactionResult {
            success: true,
            public_key: public_key.to_string(),
            signature: Some(signature),
            message_info: Some(MessageInfo::from(message)),
            ..Default::default()
        }
    }

    /// Failure carrying the error text and its source chain.
    pub fn failure(public_key: &Pubkey, error: &(dyn std::error::Error + 'static)) -> Self {
        TransactionResult {
            success: false,
            public_key: public_key.to_string(),
            error: Some(error.to_string()),
            stack: Some(error_chain(error)),
            ..Default::default()
        }
    }

    pub fn with_rule_kind(mut self, kind: Option<RuleKind>) -> Self {
        self.rule_kind = kind;
        self
    }
}

/// Render an error and all of its sources, one per line.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = format!("Error: {}", error);
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(&format!("\n    caused by: {}", cause));
        source = cause.source();
    }
    out
}

/// Layout check of a full wire transaction.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormatReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::fixtures::message_with_signers;
    use crate::domain::message::MessageError;

    #[test]
    fn test_signed_result_shape() {
        let key = Pubkey::new([1; 32]);
        let msg = message_with_signers(&[key], MessageVersion::Legacy);
        let result = TransactionResult::signed(&key, "sig".into(), &msg);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["publicKey"], key.to_string());
        assert_eq!(json["messageInfo"]["header"]["numRequiredSignatures"], 1);
        assert_eq!(json["messageInfo"]["version"], "legacy");
        assert!(json.get("error").is_none());
        assert!(json["messageInfo"].get("addressTableLookups").is_none());
    }

    #[test]
    fn test_failure_result_has_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer")]
        struct Outer(#[source] MessageError);

        let err = Outer(MessageError::LengthOverflow);
        let result = TransactionResult::failure(&Pubkey::default(), &err);

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("outer"));
        let stack = result.stack.unwrap();
        assert!(stack.contains("caused by: compact-u16 length overflows 16 bits"));
    }
}
