use std::collections::HashMap;

use bigchain_core::types::PubKey;
use bigchain_core::{LedgerError, Transaction};
use bigchain_crypto::{canonical_bytes, verify, KeyPair};

/// Sign every fulfillment of `tx` with the keys its `current_owners` name.
///
/// Signs the canonical bytes of [`Transaction::signable_body`] — the same
/// bytes the transaction's `id` was computed over — so a fulfillment's
/// signature never needs to account for other fulfillments' signatures.
/// `keys` must contain an entry for every public key appearing in any
/// fulfillment's `current_owners`.
pub fn sign_transaction(
    tx: &mut Transaction,
    keys: &HashMap<PubKey, &KeyPair>,
) -> Result<(), LedgerError> {
    let message = canonical_bytes(&tx.signable_body())?;

    for fulfillment in &mut tx.transaction.fulfillments {
        let mut signatures = Vec::with_capacity(fulfillment.current_owners.len());
        for owner in &fulfillment.current_owners {
            let keypair = keys
                .get(owner)
                .ok_or_else(|| LedgerError::InvalidTransaction(format!("missing key for owner {owner}")))?;
            signatures.push(keypair.sign(&message));
        }
        fulfillment.fulfillment = Some(signatures);
    }

    Ok(())
}

/// Verify every fulfillment of `tx` carries a valid signature from each of
/// its `current_owners`, over the transaction's signable body.
pub fn verify_transaction_signatures(tx: &Transaction) -> Result<(), LedgerError> {
    let message = canonical_bytes(&tx.signable_body())?;

    for fulfillment in &tx.transaction.fulfillments {
        let signatures = fulfillment
            .fulfillment
            .as_ref()
            .ok_or(LedgerError::InvalidSignature)?;
        if signatures.len() != fulfillment.current_owners.len() {
            return Err(LedgerError::InvalidSignature);
        }
        for (owner, signature) in fulfillment.current_owners.iter().zip(signatures) {
            verify(owner, &message, signature).map_err(|_| LedgerError::InvalidSignature)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::create_transaction;
    use bigchain_core::{Operation, Payload};

    #[test]
    fn sign_then_verify_round_trips() {
        let owner = KeyPair::generate();
        let mut tx = create_transaction(
            Operation::Create,
            vec![vec![owner.public_key().clone()]],
            vec![None],
            vec![vec![owner.public_key().clone()]],
            Payload::empty(),
            0,
        )
        .unwrap();

        let mut keys = HashMap::new();
        keys.insert(owner.public_key().clone(), &owner);
        sign_transaction(&mut tx, &keys).unwrap();

        assert!(verify_transaction_signatures(&tx).is_ok());
    }

    #[test]
    fn unsigned_transaction_fails_verification() {
        let owner = KeyPair::generate();
        let tx = create_transaction(
            Operation::Create,
            vec![vec![owner.public_key().clone()]],
            vec![None],
            vec![vec![owner.public_key().clone()]],
            Payload::empty(),
            0,
        )
        .unwrap();

        assert!(verify_transaction_signatures(&tx).is_err());
    }
}
