use rand::seq::SliceRandom;

use bigchain_core::types::PubKey;
use bigchain_core::{BacklogTransaction, LedgerError, Transaction};
use bigchain_store::{Durability, StoreAdapter};

/// Pick an assignee for a transaction about to enter the `backlog`:
/// uniformly at random from the federation excluding `self_pubkey`, or
/// `self_pubkey` itself if no other member exists. Uses the OS CSPRNG —
/// fairness isn't required, but the choice must not be predictable enough
/// for a client to target a specific node's backlog.
pub fn pick_assignee(self_pubkey: &PubKey, federation: &[PubKey]) -> PubKey {
    let others: Vec<&PubKey> = federation.iter().filter(|m| *m != self_pubkey).collect();
    match others.choose(&mut rand::thread_rng()) {
        Some(chosen) => (*chosen).clone(),
        None => self_pubkey.clone(),
    }
}

/// Assign and insert `tx` into the `backlog` with `soft` durability.
/// Duplicate submissions aren't rejected at this layer — a transaction
/// already validated and re-submitted is simply overwritten in place;
/// double-spend is caught later, at validation time.
pub fn submit_transaction(
    tx: Transaction,
    self_pubkey: &PubKey,
    federation: &[PubKey],
    store: &StoreAdapter,
) -> Result<BacklogTransaction, LedgerError> {
    let assignee = pick_assignee(self_pubkey, federation);
    let backlog_tx = BacklogTransaction::from_transaction(tx, assignee);
    store.put_backlog_transaction(&backlog_tx, Durability::Soft)?;
    Ok(backlog_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigchain_core::types::Cid;
    use bigchain_core::{Condition, Fulfillment, Operation, Payload, TransactionBody, TransactionData};
    use bigchain_crypto::KeyPair;

    fn temp_store(name: &str) -> StoreAdapter {
        let dir = std::env::temp_dir().join(format!("bigchain_tx_submit_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        StoreAdapter::open(&dir).expect("open temp store")
    }

    fn sample_tx(owner: &KeyPair) -> Transaction {
        let body = TransactionBody {
            fulfillments: vec![Fulfillment::unsigned(0, vec![owner.public_key().clone()], None)],
            conditions: vec![Condition::single_sig(0 as Cid, owner.public_key().clone())],
            operation: Operation::Create,
            timestamp: 0,
            data: TransactionData {
                payload: Payload::empty(),
                uuid: "u".into(),
            },
        };
        let id = bigchain_crypto::transaction_id(&body).unwrap();
        Transaction { id, transaction: body }
    }

    #[test]
    fn assignee_falls_back_to_self_when_alone() {
        let node = KeyPair::generate();
        let assignee = pick_assignee(node.public_key(), &[node.public_key().clone()]);
        assert_eq!(&assignee, node.public_key());
    }

    #[test]
    fn assignee_is_never_self_when_peers_exist() {
        let node = KeyPair::generate();
        let peer = KeyPair::generate();
        let federation = vec![node.public_key().clone(), peer.public_key().clone()];
        for _ in 0..20 {
            let assignee = pick_assignee(node.public_key(), &federation);
            assert_eq!(&assignee, peer.public_key());
        }
    }

    #[test]
    fn submit_inserts_into_backlog() {
        let store = temp_store("submit");
        let owner = KeyPair::generate();
        let tx = sample_tx(&owner);
        let txid = tx.id.clone();
        let backlog_tx =
            submit_transaction(tx, owner.public_key(), &[owner.public_key().clone()], &store)
                .unwrap();
        assert_eq!(backlog_tx.assignee, *owner.public_key());
        assert!(store.get_backlog_transaction(&txid).unwrap().is_some());
    }
}
