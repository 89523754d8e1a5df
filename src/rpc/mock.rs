use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::domain::pubkey::SIGNATURE_BYTES;
use crate::domain::shortvec::decode_len;
use crate::domain::{Commitment, Network, Signature};

use super::traits::{
    ClusterConnector, RpcClient, RpcError, SendConfig, SignatureStatus, SimulationOutcome,
};

/// Scripted outcome of `send_transaction`.
#[derive(Debug, Clone)]
pub enum SendBehavior {
    /// Echo the first signature of the submitted transaction, like a node does.
    Accept,
    /// Fail with a node error carrying logs.
    Reject {
        code: i64,
        message: String,
        logs: Vec<String>,
    },
}

#[derive(Debug)]
struct MockState {
    send: SendBehavior,
    simulation: SimulationOutcome,
    statuses: VecDeque<Option<SignatureStatus>>,
    default_status: Option<SignatureStatus>,
    status_error: Option<u16>,
    sent: Vec<(Vec<u8>, SendConfig)>,
    simulated: usize,
    status_polls: usize,
    networks: Vec<Network>,
}

/// In-memory cluster for testing.
#[derive(Debug, Clone)]
pub struct MockRpc {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockRpc {
    fn default() -> Self {
        MockRpc::new()
    }
}

impl MockRpc {
    /// A cluster that accepts every transaction and reports it confirmed.
    pub fn new() -> Self {
        MockRpc {
            state: Arc::new(Mutex::new(MockState {
                send: SendBehavior::Accept,
                simulation: SimulationOutcome::default(),
                statuses: VecDeque::new(),
                default_status: Some(SignatureStatus {
                    slot: 1,
                    confirmations: Some(1),
                    err: None,
                    confirmation_status: Some(Commitment::Confirmed),
                }),
                status_error: None,
                sent: Vec::new(),
                simulated: 0,
                status_polls: 0,
                networks: Vec::new(),
            })),
        }
    }

    /// Set how `send_transaction` behaves (for testing).
    pub fn set_send(&self, behavior: SendBehavior) {
        self.state.lock().send = behavior;
    }

    /// Set the simulation result (for testing).
    pub fn set_simulation(&self, outcome: SimulationOutcome) {
        self.state.lock().simulation = outcome;
    }

    /// Queue statuses returned by successive polls (for testing).
    pub fn push_status(&self, status: Option<SignatureStatus>) {
        self.state.lock().statuses.push_back(status);
    }

    /// Status returned once the queue is drained (for testing).
    pub fn set_default_status(&self, status: Option<SignatureStatus>) {
        self.state.lock().default_status = status;
    }

    /// Make every status poll fail with an HTTP `code` (for testing).
    pub fn fail_status_polls(&self, code: u16) {
        self.state.lock().status_error = Some(code);
    }

    /// Wire transactions submitted so far (for assertions).
    pub fn sent(&self) -> Vec<(Vec<u8>, SendConfig)> {
        self.state.lock().sent.clone()
    }

    /// Number of simulations requested (for assertions).
    pub fn simulated(&self) -> usize {
        self.state.lock().simulated
    }

    /// Number of status polls (for assertions).
    pub fn status_polls(&self) -> usize {
        self.state.lock().status_polls
    }

    /// Networks connected to (for assertions).
    pub fn networks(&self) -> Vec<Network> {
        self.state.lock().networks.clone()
    }
}

fn first_signature(wire: &[u8]) -> Option<Signature> {
    let (count, pos) = decode_len(wire).ok()?;
    if count == 0 {
        return None;
    }
    let raw: [u8; SIGNATURE_BYTES] = wire.get(pos..pos + SIGNATURE_BYTES)?.try_into().ok()?;
    Some(Signature::new(raw))
}

#[async_trait]
impl RpcClient for MockRpc {
    async fn send_transaction(&self, wire: &[u8], config: &SendConfig) -> Result<String, RpcError> {
        let mut state = self.state.lock();
        state.sent.push((wire.to_vec(), *config));

        match &state.send {
            SendBehavior::Accept => first_signature(wire)
                .map(|s| s.to_string())
                .ok_or_else(|| RpcError::Malformed("transaction has no signatures".into())),
            SendBehavior::Reject {
                code,
                message,
                logs,
            } => Err(RpcError::Server {
                code: *code,
                message: message.clone(),
                logs: logs.clone(),
            }),
        }
    }

    async fn simulate_transaction(
        &self,
        _wire: &[u8],
        _commitment: Commitment,
    ) -> Result<SimulationOutcome, RpcError> {
        let mut state = self.state.lock();
        state.simulated += 1;
        Ok(state.simulation.clone())
    }

    async fn signature_status(&self, _signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        let mut state = self.state.lock();
        state.status_polls += 1;
        if let Some(code) = state.status_error {
            return Err(RpcError::Status(code));
        }
        match state.statuses.pop_front() {
            Some(status) => Ok(status),
            None => Ok(state.default_status.clone()),
        }
    }
}

impl ClusterConnector for MockRpc {
    fn connect(&self, network: Network) -> Arc<dyn RpcClient> {
        self.state.lock().networks.push(network);
        Arc::new(self.clone())
    }
}
