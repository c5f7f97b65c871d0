use bigchain_core::{
    Condition, Fulfillment, Operation, Payload, Transaction, TransactionBody, TransactionData,
};
use bigchain_core::types::{Cid, Fid, PubKey, Timestamp, TxInput};
use bigchain_core::LedgerError;

use bigchain_crypto::hash::transaction_id;

/// Build an unsigned transaction.
///
/// `inputs` names the fulfillments (spent outputs for `TRANSFER`, empty for
/// `CREATE`/`GENESIS`); `current_owners` is parallel to `inputs` and gives
/// the owner set each fulfillment must eventually be signed by. `new_owners`
/// lists the owner set of each output condition, in order; each condition is
/// given a fresh `cid` equal to its position.
pub fn create_transaction(
    operation: Operation,
    current_owners: Vec<Vec<PubKey>>,
    inputs: Vec<Option<TxInput>>,
    new_owners: Vec<Vec<PubKey>>,
    payload: Payload,
    timestamp: Timestamp,
) -> Result<Transaction, LedgerError> {
    if current_owners.len() != inputs.len() {
        return Err(LedgerError::InvalidTransaction(
            "current_owners and inputs must be the same length".into(),
        ));
    }
    if operation.requires_input() && inputs.iter().any(Option::is_none) {
        return Err(LedgerError::InvalidTransaction(
            "TRANSFER fulfillments must each reference an input".into(),
        ));
    }
    if !operation.requires_input() && inputs.iter().any(Option::is_some) {
        return Err(LedgerError::InvalidTransaction(
            "CREATE/GENESIS fulfillments must not reference an input".into(),
        ));
    }
    if new_owners.is_empty() {
        return Err(LedgerError::InvalidTransaction(
            "a transaction must create at least one condition".into(),
        ));
    }

    let fulfillments = current_owners
        .into_iter()
        .zip(inputs)
        .enumerate()
        .map(|(fid, (owners, input))| Fulfillment::unsigned(fid as Fid, owners, input))
        .collect();

    let conditions = new_owners
        .into_iter()
        .enumerate()
        .map(|(cid, owners)| match owners.as_slice() {
            [single] => Condition::single_sig(cid as Cid, single.clone()),
            many => Condition {
                cid: cid as Cid,
                new_owners: many.to_vec(),
                condition: bigchain_core::ConditionBody {
                    details: bigchain_core::ConditionDetails {
                        public_key: None,
                        subconditions: many
                            .iter()
                            .cloned()
                            .map(bigchain_core::ConditionDetails::single)
                            .collect(),
                    },
                },
            },
        })
        .collect();

    let body = TransactionBody {
        fulfillments,
        conditions,
        operation,
        timestamp,
        data: TransactionData {
            payload,
            uuid: uuid::Uuid::new_v4().to_string(),
        },
    };

    let id = transaction_id(&body)?;
    Ok(Transaction {
        id,
        transaction: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigchain_crypto::KeyPair;

    #[test]
    fn create_tx_has_no_inputs() {
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
        assert!(tx.transaction.fulfillments[0].input.is_none());
    }

    #[test]
    fn transfer_without_input_is_rejected() {
        let owner = KeyPair::generate();
        let result = create_transaction(
            Operation::Transfer,
            vec![vec![owner.public_key().clone()]],
            vec![None],
            vec![vec![owner.public_key().clone()]],
            Payload::empty(),
            0,
        );
        assert!(result.is_err());
    }
}
