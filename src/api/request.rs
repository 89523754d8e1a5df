use serde::Deserialize;

use crate::cosign::SubmitOptions;
use crate::domain::{Network, RuleKind, RuleValue, UserEvidence};

use super::response::ApiError;

/// Request to evaluate a rule and attest it.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub params: VerifyParams,
}

/// Rule, evidence and attestation inputs.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    /// Rule kind tag
    pub style: RuleKind,

    /// Rule parameters
    #[serde(default)]
    pub data: RuleValue,

    /// Evidence about the subject
    #[serde(default)]
    pub user: UserEvidence,

    /// Options of a choice rule
    #[serde(default)]
    pub choices: Option<Vec<String>>,

    /// Message attested when the kind has no short code
    #[serde(default)]
    pub u: Option<String>,
}

/// Body carrying only an encoded transaction or message.
#[derive(Debug, Deserialize)]
pub struct EncodedRequest {
    #[serde(default, rename = "encodedTransaction")]
    pub encoded_transaction: Option<String>,
}

/// Body for signing a message under a rule kind.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default, rename = "encodedTransaction")]
    pub encoded_transaction: Option<String>,

    #[serde(default)]
    pub rule_type: Option<String>,
}

/// Body for co-signing with an optional broadcast.
#[derive(Debug, Deserialize)]
pub struct ProcessAndSendRequest {
    #[serde(default, rename = "encodedTransaction")]
    pub encoded_transaction: Option<String>,

    #[serde(default)]
    pub rule_type: Option<String>,

    #[serde(default)]
    pub network: Option<Network>,

    #[serde(default)]
    pub options: Option<SubmitOptions>,
}

/// Body for merging an external signature and submitting.
#[derive(Debug, Deserialize)]
pub struct SendSignedRequest {
    #[serde(default, rename = "encodedTransaction")]
    pub encoded_transaction: Option<String>,

    #[serde(default)]
    pub signature: Option<String>,

    #[serde(default)]
    pub network: Option<Network>,

    #[serde(default)]
    pub options: Option<SubmitOptions>,
}

/// Body for signing and submitting as the only service signer.
#[derive(Debug, Deserialize)]
pub struct SendVersionedRequest {
    #[serde(default, rename = "encodedTransaction")]
    pub encoded_transaction: Option<String>,

    #[serde(default)]
    pub network: Option<Network>,

    #[serde(default)]
    pub options: Option<SubmitOptions>,
}

/// Return the parameters when every one is present and non-empty.
pub fn required<'a, const N: usize>(
    values: [Option<&'a str>; N],
    message: &'static str,
) -> Result<[&'a str; N], ApiError> {
    let mut out = [""; N];
    for (slot, value) in out.iter_mut().zip(values) {
        match value {
            Some(v) if !v.trim().is_empty() => *slot = v,
            _ => return Err(ApiError::MissingParameters(message)),
        }
    }
    Ok(out)
}
