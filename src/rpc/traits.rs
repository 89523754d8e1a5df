use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Commitment, Network};

/// Errors talking to a cluster RPC node.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc node returned HTTP {0}")]
    Status(u16),

    #[error("rpc error {code}: {message}")]
    Server {
        code: i64,
        message: String,
        logs: Vec<String>,
    },

    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// Program logs attached by the node, if any.
    pub fn logs(&self) -> &[String] {
        match self {
            RpcError::Server { logs, .. } => logs,
            _ => &[],
        }
    }
}

/// Submission knobs passed straight to `sendTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendConfig {
    pub skip_preflight: bool,
    pub preflight_commitment: Commitment,
    pub max_retries: Option<u32>,
}

/// Result of a transaction simulation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    #[serde(default)]
    pub err: Option<serde_json::Value>,

    #[serde(default)]
    pub logs: Option<Vec<String>>,

    #[serde(default)]
    pub units_consumed: Option<u64>,
}

/// Status of a submitted signature.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,

    #[serde(default)]
    pub confirmations: Option<u64>,

    #[serde(default)]
    pub err: Option<serde_json::Value>,

    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Whether the status meets `level`.
    ///
    /// Nodes that omit `confirmationStatus` report finalized transactions with
    /// `confirmations: null`.
    pub fn reached(&self, level: Commitment) -> bool {
        match self.confirmation_status {
            Some(status) => status >= level,
            None => self.confirmations.is_none(),
        }
    }
}

/// Cluster RPC operations used by the co-signer.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Submit a wire transaction; returns the transaction signature text.
    async fn send_transaction(&self, wire: &[u8], config: &SendConfig) -> Result<String, RpcError>;

    /// Simulate a wire transaction without signature verification.
    async fn simulate_transaction(
        &self,
        wire: &[u8],
        commitment: Commitment,
    ) -> Result<SimulationOutcome, RpcError>;

    /// Current status of one signature, `None` if the node has not seen it.
    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError>;
}

/// Opens RPC clients for a network.
pub trait ClusterConnector: Send + Sync {
    fn connect(&self, network: Network) -> Arc<dyn RpcClient>;
}
