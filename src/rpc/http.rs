use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::{Commitment, Network};

use super::traits::{
    ClusterConnector, RpcClient, RpcError, SendConfig, SignatureStatus, SimulationOutcome,
};

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Wraps results that carry a `context` next to the `value`.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

/// Pull `data.logs` out of a node error, if present.
fn error_logs(data: Option<&Value>) -> Vec<String> {
    data.and_then(|d| d.get("logs"))
        .and_then(Value::as_array)
        .map(|logs| {
            logs.iter()
                .filter_map(|l| l.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// JSON-RPC 2.0 client for one cluster endpoint.
#[derive(Debug)]
pub struct HttpRpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        HttpRpcClient {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(url = %self.url, method, id, "rpc call");

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();

        // Nodes report JSON-RPC errors with a 200; anything else that is not
        // JSON is a transport-level failure.
        let envelope: RpcEnvelope<T> = match response.json().await {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(RpcError::Status(status.as_u16())),
            Err(e) => return Err(RpcError::Malformed(e.to_string())),
        };

        if let Some(err) = envelope.error {
            return Err(RpcError::Server {
                code: err.code,
                logs: error_logs(err.data.as_ref()),
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| RpcError::Malformed(format!("{method}: missing result")))
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn send_transaction(&self, wire: &[u8], config: &SendConfig) -> Result<String, RpcError> {
        let mut options = json!({
            "encoding": "base64",
            "skipPreflight": config.skip_preflight,
            "preflightCommitment": config.preflight_commitment,
        });
        if let Some(retries) = config.max_retries {
            options["maxRetries"] = json!(retries);
        }

        self.call("sendTransaction", json!([STANDARD.encode(wire), options]))
            .await
    }

    async fn simulate_transaction(
        &self,
        wire: &[u8],
        commitment: Commitment,
    ) -> Result<SimulationOutcome, RpcError> {
        let params = json!([
            STANDARD.encode(wire),
            {
                "encoding": "base64",
                "commitment": commitment,
                "sigVerify": false,
            }
        ]);

        let result: WithContext<SimulationOutcome> =
            self.call("simulateTransaction", params).await?;
        Ok(result.value)
    }

    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        let params = json!([[signature], { "searchTransactionHistory": false }]);

        let result: WithContext<Vec<Option<SignatureStatus>>> =
            self.call("getSignatureStatuses", params).await?;
        Ok(result.value.into_iter().next().flatten())
    }
}

/// RPC endpoint per network, sharing one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct ClusterEndpoints {
    client: reqwest::Client,
    urls: HashMap<Network, String>,
}

impl ClusterEndpoints {
    pub fn new(urls: HashMap<Network, String>, request_timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(ClusterEndpoints { client, urls })
    }

    /// Endpoint for `network`, falling back to the public one.
    pub fn url(&self, network: Network) -> String {
        self.urls
            .get(&network)
            .cloned()
            .unwrap_or_else(|| default_url(network).to_string())
    }
}

/// Public RPC endpoint of each network.
pub fn default_url(network: Network) -> &'static str {
    match network {
        Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
        Network::Devnet => "https://api.devnet.solana.com",
        Network::Testnet => "https://api.testnet.solana.com",
        Network::Localnet => "http://127.0.0.1:8899",
    }
}

impl ClusterConnector for ClusterEndpoints {
    fn connect(&self, network: Network) -> Arc<dyn RpcClient> {
        Arc::new(HttpRpcClient::new(self.client.clone(), self.url(network)))
    }
}
