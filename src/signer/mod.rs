pub mod attestation;
pub mod keys;

pub use attestation::{
    verify_attestation, Attestation, AttestationError, AttestationSigner, LedgerInstruction,
};
pub use keys::{KeyError, ServiceSigner};
