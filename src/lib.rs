pub mod api;
pub mod config;
pub mod cosign;
pub mod domain;
pub mod observability;
pub mod rpc;
pub mod rules;
pub mod signer;

pub use config::Config;
pub use cosign::{SubmitOptions, TransactionCoSigner};
pub use domain::{Rule, RuleKind, TransactionResult, UserEvidence};
pub use rules::evaluate;
pub use signer::{verify_attestation, AttestationSigner, ServiceSigner};
