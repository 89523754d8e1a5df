use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::{FormatReport, TransactionResult};
use crate::signer::LedgerInstruction;

/// Response to a rule verification.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: &'static str,
    pub msg: String,

    /// Canonical attested message, or "Invalid" when the rule failed
    pub message: String,

    /// Ed25519 verify instruction carrying the attestation
    pub instruction: Option<LedgerInstruction>,
}

impl VerifyResponse {
    pub fn passed(message: String, instruction: LedgerInstruction) -> Self {
        VerifyResponse {
            status: "Done",
            msg: String::new(),
            message,
            instruction: Some(instruction),
        }
    }

    pub fn invalid() -> Self {
        VerifyResponse {
            status: "Done",
            msg: String::new(),
            message: "Invalid".to_string(),
            instruction: None,
        }
    }
}

/// Successful co-signer response.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub status: &'static str,

    #[serde(flatten)]
    pub result: TransactionResult,
}

/// Response to a transaction format check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidResponse {
    pub status: &'static str,
    pub instruction_count: Option<usize>,
    pub signature_count: Option<usize>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub public_key: String,
    pub uptime_secs: u64,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,

    /// Set when the transaction reached the cluster before failing
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
            details: None,
            stack: None,
            logs: None,
            transaction_id: None,
        }
    }

    /// Wrap a failed co-signer result under a route-specific headline.
    pub fn from_failure(headline: &str, result: TransactionResult) -> Self {
        ErrorResponse {
            error: headline.to_string(),
            details: result.error,
            stack: result.stack,
            logs: result.logs,
            transaction_id: result.transaction_id,
        }
    }
}

/// Errors returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A required body field was absent or empty
    MissingParameters(&'static str),

    /// The co-signer returned `success: false`
    Failed {
        headline: &'static str,
        result: Box<TransactionResult>,
    },

    /// The transaction failed the format check
    InvalidFormat(FormatReport),

    /// The verify request could not be evaluated or attested
    Verification(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::MissingParameters(message) => ErrorResponse::new(message),
            ApiError::Failed { headline, result } => ErrorResponse::from_failure(headline, *result),
            ApiError::InvalidFormat(report) => ErrorResponse {
                details: report.error,
                ..ErrorResponse::new("Invalid transaction format")
            },
            ApiError::Verification(details) => ErrorResponse {
                details: Some(details),
                ..ErrorResponse::new("Verification ERROR")
            },
        };

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Map a co-signer result to 200 or 400.
pub fn cosign_response(
    result: TransactionResult,
    headline: &'static str,
) -> Result<Json<SuccessResponse>, ApiError> {
    if result.success {
        Ok(Json(SuccessResponse {
            status: "Success",
            result,
        }))
    } else {
        Err(ApiError::Failed {
            headline,
            result: Box::new(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_verify_response() {
        let json = serde_json::to_value(VerifyResponse::invalid()).unwrap();

        assert_eq!(json["status"], "Done");
        assert_eq!(json["message"], "Invalid");
        assert!(json["instruction"].is_null());
    }

    #[test]
    fn test_success_response_flattens_result() {
        let result = TransactionResult {
            success: true,
            public_key: "key".into(),
            signature: Some("sig".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(cosign_response(result, "failed").unwrap().0).unwrap();

        assert_eq!(json["status"], "Success");
        assert_eq!(json["publicKey"], "key");
        assert_eq!(json["signature"], "sig");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_maps_to_bad_request() {
        let result = TransactionResult {
            success: false,
            error: Some("transaction submission failed".into()),
            stack: Some("Error: transaction submission failed".into()),
            logs: Some(vec!["Program log: boom".into()]),
            ..Default::default()
        };
        let err = cosign_response(result, "Transaction sending failed").unwrap_err();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_response_from_failure() {
        let result = TransactionResult {
            success: false,
            error: Some("bad".into()),
            stack: Some("Error: bad".into()),
            ..Default::default()
        };
        let json =
            serde_json::to_value(ErrorResponse::from_failure("Transaction processing failed", result))
                .unwrap();

        assert_eq!(json["error"], "Transaction processing failed");
        assert_eq!(json["details"], "bad");
        assert_eq!(json["stack"], "Error: bad");
        assert!(json.get("logs").is_none());
        assert!(json.get("transactionId").is_none());
    }
}
