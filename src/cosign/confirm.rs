use tracing::{debug, warn};

use crate::domain::{Commitment, Confirmation};
use crate::rpc::RpcClient;

use super::error::CoSignError;
use super::options::ConfirmPolicy;

/// Poll the cluster until `signature` reaches `level`, fails, or the policy runs out.
pub async fn await_confirmation(
    rpc: &dyn RpcClient,
    signature: &str,
    level: Commitment,
    policy: &ConfirmPolicy,
) -> Result<Confirmation, CoSignError> {
    for attempt in 1..=policy.max_attempts {
        let polled = rpc
            .signature_status(signature)
            .await
            .map_err(|source| CoSignError::StatusCheck {
                signature: signature.to_string(),
                source,
            })?;

        if let Some(status) = polled {
            if let Some(err) = &status.err {
                warn!(signature, %err, "transaction failed on chain");
                return Err(CoSignError::OnChain {
                    signature: signature.to_string(),
                    err: err.to_string(),
                });
            }

            if status.reached(level) {
                debug!(signature, attempt, slot = status.slot, "transaction confirmed");
                return Ok(Confirmation {
                    commitment: status.confirmation_status.unwrap_or(Commitment::Finalized),
                    slot: status.slot,
                    confirmations: status.confirmations,
                });
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }

    Err(CoSignError::ConfirmationTimeout {
        signature: signature.to_string(),
        commitment: level,
        attempts: policy.max_attempts,
    })
}
