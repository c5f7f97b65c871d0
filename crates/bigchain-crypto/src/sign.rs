use ed25519_dalek::{Verifier, VerifyingKey};

use bigchain_core::types::{PubKey, Signature};
use bigchain_core::LedgerError;

/// Verify `signature` over `message` under `public_key`.
pub fn verify(public_key: &PubKey, message: &[u8], signature: &Signature) -> Result<(), LedgerError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key.as_bytes()).map_err(|_| LedgerError::InvalidHash)?;
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying_key
        .verify(message, &sig)
        .map_err(|_| LedgerError::InvalidSignature)
}
