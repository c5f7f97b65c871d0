use sha3::{Digest, Sha3_256};

use bigchain_core::{Hash, LedgerError, Transaction, TransactionBody};

use crate::canonical::canonical_bytes;

/// `hash(x) = sha3_256(canonical(x))`.
pub fn hash_value<T: serde::Serialize>(value: &T) -> Result<Hash, LedgerError> {
    let bytes = canonical_bytes(value)?;
    Ok(Hash::from_bytes(sha3_256(&bytes)))
}

fn sha3_256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// The id of a transaction: the hash of its `signable_body` (fulfillment
/// signatures cleared), never the body as actually signed.
pub fn transaction_id(body: &TransactionBody) -> Result<Hash, LedgerError> {
    hash_value(body)
}

/// Recompute and check a transaction's id against its stored body.
pub fn verify_transaction_id(tx: &Transaction) -> Result<bool, LedgerError> {
    let recomputed = transaction_id(&tx.signable_body())?;
    Ok(recomputed == tx.id)
}
