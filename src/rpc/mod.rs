pub mod http;
pub mod mock;
pub mod traits;

pub use http::{ClusterEndpoints, HttpRpcClient};
pub use mock::MockRpc;
pub use traits::{
    ClusterConnector, RpcClient, RpcError, SendConfig, SignatureStatus, SimulationOutcome,
};
