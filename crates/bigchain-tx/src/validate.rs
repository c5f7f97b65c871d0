use bigchain_core::types::TxInput;
use bigchain_core::{Condition, LedgerError, Operation, Transaction};
use bigchain_crypto::transaction_id;

use crate::sign::verify_transaction_signatures;

/// Looks up the output an input refers to, and whether it has already been
/// spent. Implemented by the store layer; kept as a trait here so the
/// transaction engine has no dependency on any particular storage backend.
pub trait InputResolver {
    fn resolve_condition(&self, input: &TxInput) -> Option<Condition>;
    fn is_spent(&self, input: &TxInput) -> bool;
}

/// Structural and cryptographic validation that does not require a store:
/// recomputes the id, checks operation/fulfillment shape, and verifies
/// every fulfillment signature.
pub fn validate_transaction_structure(tx: &Transaction) -> Result<(), LedgerError> {
    let expected_id = transaction_id(&tx.signable_body())?;
    if expected_id != tx.id {
        return Err(LedgerError::InvalidHash);
    }

    if tx.transaction.conditions.is_empty() {
        return Err(LedgerError::InvalidTransaction(
            "transaction has no conditions".into(),
        ));
    }

    match tx.transaction.operation {
        Operation::Create | Operation::Genesis => {
            if tx.transaction.fulfillments.iter().any(|f| f.input.is_some()) {
                return Err(LedgerError::InvalidTransaction(
                    "CREATE/GENESIS fulfillments must not reference an input".into(),
                ));
            }
        }
        Operation::Transfer => {
            if tx.transaction.fulfillments.iter().any(|f| f.input.is_none()) {
                return Err(LedgerError::InvalidTransaction(
                    "TRANSFER fulfillments must each reference an input".into(),
                ));
            }
        }
    }

    verify_transaction_signatures(tx)
}

/// Check every `TRANSFER` fulfillment of `tx` against `resolver`: its input
/// must resolve to an existing, unspent condition owned by the
/// fulfillment's claimed `current_owners`. A no-op for `CREATE`/`GENESIS`.
pub fn validate_fulfillments<R: InputResolver>(
    tx: &Transaction,
    resolver: &R,
) -> Result<(), LedgerError> {
    if tx.transaction.operation != Operation::Transfer {
        return Ok(());
    }

    for fulfillment in &tx.transaction.fulfillments {
        let input = fulfillment
            .input
            .as_ref()
            .expect("TRANSFER fulfillments were checked to carry an input");

        if resolver.is_spent(input) {
            return Err(LedgerError::DoubleSpend(input.clone()));
        }

        let condition = resolver
            .resolve_condition(input)
            .ok_or_else(|| LedgerError::InvalidTransaction(format!("unknown input {input:?}")))?;

        for owner in &fulfillment.current_owners {
            if !condition.owned_by(owner) {
                return Err(LedgerError::TransactionOwnerError);
            }
        }
    }

    Ok(())
}

/// Full validation of a transaction against a store: structural checks
/// plus, for `TRANSFER`, [`validate_fulfillments`].
pub fn validate_transaction<R: InputResolver>(
    tx: &Transaction,
    resolver: &R,
) -> Result<(), LedgerError> {
    validate_transaction_structure(tx)?;
    validate_fulfillments(tx, resolver)
}

/// Boolean-form validation: same checks as [`validate_transaction`], but
/// collapses every failure to `false` instead of propagating the error.
/// Chain-corruption-class errors are never produced here, so this never
/// hides them; it only discards the distinction between failure reasons.
pub fn is_valid_transaction<R: InputResolver>(tx: &Transaction, resolver: &R) -> bool {
    validate_transaction(tx, resolver).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::create_transaction;
    use crate::sign::sign_transaction;
    use bigchain_core::Payload;
    use bigchain_crypto::KeyPair;
    use std::collections::HashMap;

    struct NullResolver;
    impl InputResolver for NullResolver {
        fn resolve_condition(&self, _input: &TxInput) -> Option<Condition> {
            None
        }
        fn is_spent(&self, _input: &TxInput) -> bool {
            false
        }
    }

    fn signed_create_tx(owner: &KeyPair) -> Transaction {
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
        keys.insert(owner.public_key().clone(), owner);
        sign_transaction(&mut tx, &keys).unwrap();
        tx
    }

    #[test]
    fn well_formed_create_tx_validates() {
        let owner = KeyPair::generate();
        let tx = signed_create_tx(&owner);
        assert!(validate_transaction(&tx, &NullResolver).is_ok());
    }

    #[test]
    fn tampered_id_is_rejected() {
        let owner = KeyPair::generate();
        let mut tx = signed_create_tx(&owner);
        tx.id = bigchain_core::Hash::from_bytes([7u8; 32]);
        assert!(matches!(
            validate_transaction_structure(&tx),
            Err(LedgerError::InvalidHash)
        ));
    }
}
