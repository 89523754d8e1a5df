use serde::Deserialize;
use std::time::Duration;

use crate::domain::{Commitment, SignerSlot};
use crate::rpc::SendConfig;

fn default_max_retries() -> Option<u32> {
    Some(3)
}

fn default_true() -> bool {
    true
}

/// Per-request submission options.
///
/// Unspecified fields take their documented defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitOptions {
    /// Skip the node's preflight checks
    pub skip_preflight: bool,

    /// Commitment level used for preflight
    pub preflight_commitment: Commitment,

    /// Commitment level to wait for after submission
    pub commitment: Commitment,

    /// Rebroadcast attempts the node may make; `null` leaves it to the node
    #[serde(default = "default_max_retries")]
    pub max_retries: Option<u32>,

    /// Wait for the transaction to reach `commitment`
    #[serde(default = "default_true")]
    pub wait_for_confirmation: bool,

    /// Simulate before submitting and stop on simulation errors
    pub simulate_first: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        SubmitOptions {
            skip_preflight: false,
            preflight_commitment: Commitment::Confirmed,
            commitment: Commitment::Confirmed,
            max_retries: Some(3),
            wait_for_confirmation: true,
            simulate_first: false,
        }
    }
}

impl SubmitOptions {
    pub fn send_config(&self) -> SendConfig {
        SendConfig {
            skip_preflight: self.skip_preflight,
            preflight_commitment: self.preflight_commitment,
            max_retries: self.max_retries,
        }
    }
}

/// Confirmation polling bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        ConfirmPolicy {
            poll_interval: Duration::from_millis(500),
            max_attempts: 60,
        }
    }
}

/// Service-wide co-signing settings, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoSignSettings {
    /// Slot the service signature occupies
    pub service_slot: SignerSlot,

    /// Submit after co-signing instead of returning the partial transaction
    pub broadcast_on_co_sign: bool,

    pub confirm: ConfirmPolicy,
}
