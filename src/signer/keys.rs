use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;

use crate::domain::{Pubkey, Signature};

/// Length of the seed the keypair is derived from.
pub const SEED_BYTES: usize = 32;

/// Errors loading the service key.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("signer secret is not a JSON byte array: {0}")]
    Format(#[from] serde_json::Error),

    #[error("signer secret has {0} bytes, expected 32 or 64")]
    Length(usize),
}

/// The service's Ed25519 keypair.
///
/// Derived once at startup from a fixed seed and shared read-only; signing is
/// deterministic, so concurrent callers signing the same bytes get the same
/// signature.
pub struct ServiceSigner {
    key: SigningKey,
    pubkey: Pubkey,
}

impl ServiceSigner {
    /// Derive the keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_BYTES]) -> Self {
        let key = SigningKey::from_bytes(seed);
        let pubkey = Pubkey::new(key.verifying_key().to_bytes());
        ServiceSigner { key, pubkey }
    }

    /// Parse a secret given as a JSON byte array.
    ///
    /// Both a bare 32-byte seed and a 64-byte keypair export are accepted;
    /// only the first 32 bytes (the seed) are used.
    pub fn from_secret_json(secret: &str) -> Result<Self, KeyError> {
        let bytes: Vec<u8> = serde_json::from_str(secret)?;
        if bytes.len() != SEED_BYTES && bytes.len() != SEED_BYTES * 2 {
            return Err(KeyError::Length(bytes.len()));
        }

        let mut seed = [0u8; SEED_BYTES];
        seed.copy_from_slice(&bytes[..SEED_BYTES]);
        Ok(Self::from_seed(&seed))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    pub fn sign(&self, bytes: &[u8]) -> Signature {
        Signature::from(self.key.sign(bytes))
    }
}

impl std::fmt::Debug for ServiceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSigner")
            .field("pubkey", &self.pubkey)
            .finish_non_exhaustive()
    }
}

/// Check an Ed25519 signature over `message` by `pubkey`.
pub fn verify_signature(message: &[u8], signature: &Signature, pubkey: &Pubkey) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(pubkey.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify(message, &sig).is_ok()
}
