use std::collections::HashMap;

use bigchain_consensus::{election_status, ElectionStatus};
use bigchain_core::constants::{CATEGORY_ASSET, ISSUE_CREATE, ISSUE_DESTROY, ISSUE_TRANSFER};
use bigchain_core::types::{PubKey, TxInput};
use bigchain_core::{now_unix, LedgerError, Operation, Payload, Transaction};
use bigchain_crypto::KeyPair;
use bigchain_query::Query;
use bigchain_store::StoreAdapter;
use bigchain_tx::{create_transaction, sign_transaction, submit_transaction};

/// Asset domain operations. Asset identity is a caller-supplied content
/// hash carried in `payload.asset`; the "chain" for an asset is simply the
/// set of transactions whose payload names that hash.
pub struct AssetLedger<'a> {
    pub node: &'a KeyPair,
    pub federation: &'a [PubKey],
    pub store: &'a StoreAdapter,
}

impl<'a> AssetLedger<'a> {
    pub fn new(node: &'a KeyPair, federation: &'a [PubKey], store: &'a StoreAdapter) -> Self {
        Self { node, federation, store }
    }

    fn query(&self) -> Query<'_> {
        Query::new(self.store)
    }

    fn tx_list_by_asset(&self, asset: &str) -> Result<Vec<Transaction>, LedgerError> {
        let mut out = Vec::new();
        for block in self.store.iter_blocks()? {
            if election_status(&block) == ElectionStatus::Invalid {
                continue;
            }
            for tx in &block.block.transactions {
                if tx.transaction.data.payload.category() == Some(CATEGORY_ASSET)
                    && tx.transaction.data.payload.get_str("asset") == Some(asset)
                {
                    out.push(tx.clone());
                }
            }
        }
        Ok(out)
    }

    fn owner_of(tx: &Transaction) -> Result<PubKey, LedgerError> {
        tx.transaction
            .conditions
            .first()
            .and_then(|c| c.new_owners.first().cloned())
            .ok_or_else(|| LedgerError::InvalidTransaction("asset transaction has no owner condition".into()))
    }

    fn is_federation_node(&self, candidate: &PubKey) -> bool {
        candidate == self.node.public_key() || self.federation.contains(candidate)
    }

    /// The most recent (by block+transaction timestamp) transaction naming
    /// `asset`, dropped from `VALID`/`UNDECIDED` blocks only. Fails with
    /// `InvalidAsset` if the asset has no history, or if its current owner
    /// is a federation node — the marker `destroy_asset` leaves behind.
    pub fn last_tx_by_asset(&self, asset: &str) -> Result<Transaction, LedgerError> {
        let mut candidates = self.tx_list_by_asset(asset)?;
        candidates.sort_by_key(|tx| tx.transaction.timestamp);
        let tx = candidates
            .pop()
            .ok_or_else(|| LedgerError::InvalidAsset(format!("unknown asset {asset}")))?;

        let owner = Self::owner_of(&tx)?;
        if self.is_federation_node(&owner) {
            return Err(LedgerError::InvalidAsset(format!("asset {asset} has been destroyed")));
        }
        Ok(tx)
    }

    /// `new_owners` of the condition in the asset's last transaction.
    pub fn owner(&self, asset: &str) -> Result<Vec<PubKey>, LedgerError> {
        let tx = self.last_tx_by_asset(asset)?;
        Ok(tx.transaction.conditions.first().map(|c| c.new_owners.clone()).unwrap_or_default())
    }

    fn submit(&self, tx: Transaction) -> Result<Transaction, LedgerError> {
        submit_transaction(tx.clone(), self.node.public_key(), self.federation, self.store)?;
        Ok(tx)
    }

    /// Mint a brand new asset to `recipient`. Fails with `InvalidAsset` if
    /// `payload.asset` already names an existing, non-destroyed asset.
    pub fn create_asset(&self, recipient: &PubKey, mut payload: Payload) -> Result<Transaction, LedgerError> {
        let asset = payload
            .get_str("asset")
            .map(str::to_string)
            .ok_or_else(|| LedgerError::InvalidPayload("asset payload missing `asset`".into()))?;

        if !self.tx_list_by_asset(&asset)?.is_empty() {
            return Err(LedgerError::InvalidAsset(format!("asset {asset} already exists")));
        }

        payload.set_str("category", CATEGORY_ASSET);
        payload.set_str("issue", ISSUE_CREATE);

        let mut tx = create_transaction(
            Operation::Create,
            vec![vec![self.node.public_key().clone()]],
            vec![None],
            vec![vec![recipient.clone()]],
            payload,
            now_unix(),
        )?;
        let mut keys = HashMap::new();
        keys.insert(self.node.public_key().clone(), self.node);
        sign_transaction(&mut tx, &keys)?;
        self.submit(tx)
    }

    /// Transfer ownership of `input` (an output of a prior asset
    /// transaction) from `old_pub` to `new_pub`, signed by `old_priv`.
    pub fn transfer_asset(
        &self,
        old_pub: &PubKey,
        old_priv: &KeyPair,
        new_pub: &PubKey,
        input: TxInput,
    ) -> Result<Transaction, LedgerError> {
        let (prior, _status) = self
            .query()
            .get_transaction(&input.txid)?
            .ok_or_else(|| LedgerError::TransactionDoesNotExist(input.txid.to_hex()))?;

        let mut payload = prior.transaction.data.payload.clone();
        payload.set_str("issue", ISSUE_TRANSFER);

        let mut tx = create_transaction(
            Operation::Transfer,
            vec![vec![old_pub.clone()]],
            vec![Some(input)],
            vec![vec![new_pub.clone()]],
            payload,
            now_unix(),
        )?;
        let mut keys = HashMap::new();
        keys.insert(old_pub.clone(), old_priv);
        sign_transaction(&mut tx, &keys)?;
        self.submit(tx)
    }

    /// Transfer the asset's last output from `pub_key` to the node itself,
    /// marking it destroyed: `last_tx_by_asset` will refuse it from then on.
    pub fn destroy_asset(&self, pub_key: &PubKey, priv_key: &KeyPair, asset: &str) -> Result<Transaction, LedgerError> {
        let last = self.last_tx_by_asset(asset)?;
        let cid = last.transaction.conditions.first().map(|c| c.cid).unwrap_or(0);
        let input = TxInput { txid: last.id.clone(), cid };

        let mut payload = last.transaction.data.payload.clone();
        payload.set_str("issue", ISSUE_DESTROY);

        let mut tx = create_transaction(
            Operation::Transfer,
            vec![vec![pub_key.clone()]],
            vec![Some(input)],
            vec![vec![self.node.public_key().clone()]],
            payload,
            now_unix(),
        )?;
        let mut keys = HashMap::new();
        keys.insert(pub_key.clone(), priv_key);
        sign_transaction(&mut tx, &keys)?;
        self.submit(tx)
    }
}

/// Every asset hash `owner` currently holds an unspent output for — built
/// entirely from [`Query::owned_ids`], filtered to asset-category payloads.
pub fn owned_assets(query: &Query<'_>, owner: &PubKey) -> Result<Vec<String>, LedgerError> {
    let mut out = Vec::new();
    for input in query.owned_ids(owner)? {
        let Some((tx, _status)) = query.get_transaction(&input.txid)? else {
            continue;
        };
        if tx.transaction.data.payload.category() == Some(CATEGORY_ASSET) {
            if let Some(asset) = tx.transaction.data.payload.get_str("asset") {
                out.push(asset.to_string());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigchain_consensus::{cast_vote, create_block, write_vote, Federation};
    use bigchain_store::Durability;
    use serde_json::json;

    fn temp_store(name: &str) -> StoreAdapter {
        let dir = std::env::temp_dir().join(format!("bigchain_domain_asset_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        StoreAdapter::open(&dir).expect("open temp store")
    }

    fn settle_backlog(store: &StoreAdapter, node: &KeyPair, federation: &Federation) {
        let txs: Vec<Transaction> = store
            .iter_backlog()
            .unwrap()
            .into_iter()
            .map(|b| b.as_transaction())
            .collect();
        if txs.is_empty() {
            return;
        }
        let block = create_block(txs, node, federation).unwrap();
        store.put_block(&block, Durability::Hard).unwrap();
        let vote = cast_vote(&block, block.id.clone(), true, None, node).unwrap();
        write_vote(store, &block.id, vote, Durability::Hard).unwrap();
        for backlog_tx in store.iter_backlog().unwrap() {
            store.remove_backlog_transaction(&backlog_tx).unwrap();
        }
    }

    #[test]
    fn duplicate_asset_creation_is_rejected() {
        let store = temp_store("dup_asset");
        let node = KeyPair::generate();
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let federation_members = vec![node.public_key().clone()];
        let federation = Federation::new(federation_members.clone());
        let ledger = AssetLedger::new(&node, &federation_members, &store);

        let mut payload = Payload::empty();
        payload.set("asset", json!("H"));
        ledger.create_asset(a.public_key(), payload).unwrap();
        settle_backlog(&store, &node, &federation);

        let mut dup_payload = Payload::empty();
        dup_payload.set("asset", json!("H"));
        let result = ledger.create_asset(b.public_key(), dup_payload);
        assert!(matches!(result, Err(LedgerError::InvalidAsset(_))));
    }

    #[test]
    fn transfer_then_destroy_marks_asset_gone() {
        let store = temp_store("transfer_destroy");
        let node = KeyPair::generate();
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let federation_members = vec![node.public_key().clone()];
        let federation = Federation::new(federation_members.clone());
        let ledger = AssetLedger::new(&node, &federation_members, &store);

        let mut payload = Payload::empty();
        payload.set("asset", json!("H2"));
        ledger.create_asset(a.public_key(), payload).unwrap();
        settle_backlog(&store, &node, &federation);

        let last = ledger.last_tx_by_asset("H2").unwrap();
        let input = TxInput {
            txid: last.id.clone(),
            cid: last.transaction.conditions[0].cid,
        };
        ledger
            .transfer_asset(a.public_key(), &a, b.public_key(), input)
            .unwrap();
        settle_backlog(&store, &node, &federation);

        assert_eq!(ledger.owner("H2").unwrap(), vec![b.public_key().clone()]);

        ledger.destroy_asset(b.public_key(), &b, "H2").unwrap();
        settle_backlog(&store, &node, &federation);

        assert!(matches!(
            ledger.last_tx_by_asset("H2"),
            Err(LedgerError::InvalidAsset(_))
        ));
    }
}
