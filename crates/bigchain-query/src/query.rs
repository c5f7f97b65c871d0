use bigchain_core::types::{PayloadHash, PubKey, TxId, TxInput};
use bigchain_core::{Block, Condition, LedgerError, Transaction};
use bigchain_consensus::{election_status, ElectionStatus};
use bigchain_store::StoreAdapter;
use bigchain_tx::InputResolver;

use crate::status::TransactionStatus;

/// Read-only queries over the decided ledger (`bigchain`). Borrows the
/// store rather than owning it, mirroring how the rest of the ledger
/// layers a read path over a shared store handle.
pub struct Query<'a> {
    store: &'a StoreAdapter,
}

impl<'a> Query<'a> {
    pub fn new(store: &'a StoreAdapter) -> Self {
        Self { store }
    }

    /// Every block containing `txid`, paired with its election status,
    /// `INVALID` blocks excluded. More than one `VALID` entry means the
    /// ledger itself is corrupt — the same transaction was included in two
    /// blocks that both reached consensus.
    pub fn blocks_status_containing_tx(
        &self,
        txid: &TxId,
    ) -> Result<Vec<(Block, ElectionStatus)>, LedgerError> {
        let mut out = Vec::new();
        let mut valid_count = 0;
        for block in self.store.blocks_containing_tx(txid)? {
            let status = election_status(&block);
            if status == ElectionStatus::Invalid {
                continue;
            }
            if status == ElectionStatus::Valid {
                valid_count += 1;
            }
            out.push((block, status));
        }
        if valid_count > 1 {
            return Err(LedgerError::ChainCorruption(txid.to_hex()));
        }
        Ok(out)
    }

    /// Look up a transaction by id, preferring a `VALID` block's copy over
    /// an `UNDECIDED` one if — oddly — both exist (they shouldn't, absent
    /// corruption, since only one block containing it can still be live).
    pub fn get_transaction(
        &self,
        txid: &TxId,
    ) -> Result<Option<(Transaction, TransactionStatus)>, LedgerError> {
        let candidates = self.blocks_status_containing_tx(txid)?;

        let mut undecided_pick = None;
        for (block, status) in candidates {
            let tx = block
                .block
                .transactions
                .into_iter()
                .find(|t| &t.id == txid);
            let Some(tx) = tx else { continue };
            match status {
                ElectionStatus::Valid => return Ok(Some((tx, TransactionStatus::Valid))),
                ElectionStatus::Undecided => undecided_pick = Some(tx),
                ElectionStatus::Invalid => unreachable!("filtered out above"),
            }
        }
        Ok(undecided_pick.map(|tx| (tx, TransactionStatus::Undecided)))
    }

    /// Whether `input` has already been spent by a `TRANSFER` transaction
    /// living in a non-`INVALID` block. More than one such spend is a
    /// double-spend.
    pub fn spent(&self, input: &TxInput) -> Result<bool, LedgerError> {
        let spenders = self.find_spenders(input)?;
        if spenders.len() > 1 {
            return Err(LedgerError::DoubleSpend(input.clone()));
        }
        Ok(!spenders.is_empty())
    }

    fn find_spenders(&self, input: &TxInput) -> Result<Vec<Transaction>, LedgerError> {
        let mut out = Vec::new();
        for block in self.store.iter_blocks()? {
            if election_status(&block) == ElectionStatus::Invalid {
                continue;
            }
            for tx in &block.block.transactions {
                if tx
                    .transaction
                    .fulfillments
                    .iter()
                    .any(|f| f.input.as_ref() == Some(input))
                {
                    out.push(tx.clone());
                }
            }
        }
        Ok(out)
    }

    /// Every output currently unspent and owned by `owner`: every
    /// condition in a `VALID`/`UNDECIDED` block whose ownership predicate
    /// includes `owner`, with anything [`Query::spent`] resolves filtered
    /// back out.
    pub fn owned_ids(&self, owner: &PubKey) -> Result<Vec<TxInput>, LedgerError> {
        let mut out = Vec::new();
        for block in self.store.iter_blocks()? {
            if election_status(&block) == ElectionStatus::Invalid {
                continue;
            }
            for tx in &block.block.transactions {
                for condition in &tx.transaction.conditions {
                    if condition.owned_by(owner) {
                        let input = TxInput {
                            txid: tx.id.clone(),
                            cid: condition.cid,
                        };
                        if !self.spent(&input)? {
                            out.push(input);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Same as [`Query::owned_ids`] but in ascending transaction-timestamp
    /// order, using the store's time index instead of a full block scan.
    pub fn owned_ids_by_timeorder(&self, owner: &PubKey) -> Result<Vec<TxInput>, LedgerError> {
        let mut out = Vec::new();
        for (tx, _block_id) in self.store.transactions_by_timeorder()? {
            for condition in &tx.transaction.conditions {
                if condition.owned_by(owner) {
                    let input = TxInput {
                        txid: tx.id.clone(),
                        cid: condition.cid,
                    };
                    if !self.spent(&input)? {
                        out.push(input);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Among blocks where `node_pubkey` is a voter and has already voted,
    /// the one with the highest `block_number`; falls back to the genesis
    /// block (`block_number == 0`) if `node_pubkey` has not voted on
    /// anything yet.
    pub fn last_voted_block(&self, node_pubkey: &PubKey) -> Result<Option<Block>, LedgerError> {
        let mut latest: Option<Block> = None;
        let mut genesis: Option<Block> = None;
        for block in self.store.iter_blocks()? {
            if block.block_number == Some(0) {
                genesis = Some(block.clone());
            }
            if !block.block.voters.contains(node_pubkey) {
                continue;
            }
            if block.has_vote_from(node_pubkey).is_none() {
                continue;
            }
            let replace = match &latest {
                None => true,
                Some(current) => block.block_number > current.block_number,
            };
            if replace {
                latest = Some(block);
            }
        }
        Ok(latest.or(genesis))
    }

    /// Every block `node_pubkey` has not yet voted on, ordered by block
    /// timestamp ascending, excluding the genesis block if it would
    /// otherwise sort to the head.
    pub fn unvoted_blocks(&self, node_pubkey: &PubKey) -> Result<Vec<Block>, LedgerError> {
        let mut blocks: Vec<Block> = self
            .store
            .iter_blocks()?
            .into_iter()
            .filter(|b| b.has_vote_from(node_pubkey).is_none())
            .filter(|b| b.block_number != Some(0))
            .collect();
        blocks.sort_by_key(|b| b.block.timestamp);
        Ok(blocks)
    }

    /// Every transaction anywhere in the ledger whose payload hashes to
    /// `hash`.
    pub fn tx_by_payload_hash(&self, hash: &PayloadHash) -> Result<Vec<Transaction>, LedgerError> {
        self.store.tx_by_payload_hash(hash)
    }

    // ── Statistics ───────────────────────────────────────────────────────────
    //
    // Raw ledger counters, not spendability queries: every transaction in
    // every decided block counts, `INVALID` blocks included, since these
    // report on ledger activity rather than current ownership.

    fn all_transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        let mut out = Vec::new();
        for block in self.store.iter_blocks()? {
            out.extend(block.block.transactions);
        }
        Ok(out)
    }

    fn tx_touches_owner(tx: &Transaction, owner: &PubKey) -> bool {
        tx.transaction
            .conditions
            .iter()
            .any(|c| c.new_owners.contains(owner))
            || tx
                .transaction
                .fulfillments
                .iter()
                .any(|f| f.current_owners.contains(owner))
    }

    fn is_genesis_transaction(tx: &Transaction) -> bool {
        tx.transaction.data.payload.get_str("message")
            == Some(bigchain_core::constants::GENESIS_PAYLOAD_MESSAGE)
    }

    /// Total transaction count. `owner` restricts to transactions where it
    /// appears as a sender or receiver (the two legs are summed, so a
    /// transaction where `owner` is both still counts once per leg it
    /// appears in — in practice at most once since inputs and outputs of a
    /// single transaction never name the same owner twice). With no
    /// `owner` filter, the genesis transaction is excluded.
    pub fn count_transactions(&self, owner: Option<&PubKey>) -> Result<u64, LedgerError> {
        let txs = self.all_transactions()?;
        let count = match owner {
            Some(owner) => txs.iter().filter(|tx| Self::tx_touches_owner(tx, owner)).count(),
            None => txs.iter().filter(|tx| !Self::is_genesis_transaction(tx)).count(),
        };
        Ok(count as u64)
    }

    fn count_by_category(&self, category: &str, owner: Option<&PubKey>) -> Result<u64, LedgerError> {
        Ok(self
            .all_transactions()?
            .into_iter()
            .filter(|tx| tx.transaction.data.payload.category() == Some(category))
            .filter(|tx| owner.map_or(true, |o| Self::tx_touches_owner(tx, o)))
            .count() as u64)
    }

    pub fn count_currency_transactions(&self, owner: Option<&PubKey>) -> Result<u64, LedgerError> {
        self.count_by_category(bigchain_core::constants::CATEGORY_CURRENCY, owner)
    }

    pub fn count_asset_transactions(&self, owner: Option<&PubKey>) -> Result<u64, LedgerError> {
        self.count_by_category(bigchain_core::constants::CATEGORY_ASSET, owner)
    }

    fn count_by_category_and_issue(
        &self,
        category: &str,
        issue: &str,
        owner: Option<&PubKey>,
    ) -> Result<u64, LedgerError> {
        Ok(self
            .all_transactions()?
            .into_iter()
            .filter(|tx| {
                tx.transaction.data.payload.category() == Some(category)
                    && tx.transaction.data.payload.issue() == Some(issue)
            })
            .filter(|tx| owner.map_or(true, |o| Self::tx_touches_owner(tx, o)))
            .count() as u64)
    }

    pub fn count_currency_transactions_by_issue(
        &self,
        issue: &str,
        owner: Option<&PubKey>,
    ) -> Result<u64, LedgerError> {
        self.count_by_category_and_issue(bigchain_core::constants::CATEGORY_CURRENCY, issue, owner)
    }

    pub fn count_asset_transactions_by_issue(
        &self,
        issue: &str,
        owner: Option<&PubKey>,
    ) -> Result<u64, LedgerError> {
        self.count_by_category_and_issue(bigchain_core::constants::CATEGORY_ASSET, issue, owner)
    }
}

impl<'a> InputResolver for Query<'a> {
    fn resolve_condition(&self, input: &TxInput) -> Option<Condition> {
        let (tx, _status) = self.get_transaction(&input.txid).ok().flatten()?;
        tx.transaction
            .conditions
            .into_iter()
            .find(|c| c.cid == input.cid)
    }

    fn is_spent(&self, input: &TxInput) -> bool {
        self.spent(input).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigchain_consensus::{create_block, Federation};
    use bigchain_core::types::Cid;
    use bigchain_core::{Fulfillment, Operation, Payload, TransactionBody, TransactionData};
    use bigchain_crypto::KeyPair;
    use bigchain_store::Durability;

    fn temp_store(name: &str) -> StoreAdapter {
        let dir = std::env::temp_dir().join(format!("bigchain_query_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        StoreAdapter::open(&dir).expect("open temp store")
    }

    fn create_tx(owner: &KeyPair) -> Transaction {
        let body = TransactionBody {
            fulfillments: vec![Fulfillment::unsigned(0, vec![owner.public_key().clone()], None)],
            conditions: vec![Condition::single_sig(0 as Cid, owner.public_key().clone())],
            operation: Operation::Create,
            timestamp: 10,
            data: TransactionData {
                payload: Payload::empty(),
                uuid: "u".into(),
            },
        };
        let id = bigchain_crypto::transaction_id(&body).unwrap();
        Transaction { id, transaction: body }
    }

    fn voted_block(store: &StoreAdapter, node: &KeyPair, tx: Transaction, valid_votes: usize) -> Block {
        let federation = Federation::new((0..valid_votes.max(1)).map(|_| KeyPair::generate().public_key().clone()).collect());
        let block = create_block(vec![tx], node, &federation).unwrap();
        store.put_block(&block, Durability::Hard).unwrap();
        block
    }

    #[test]
    fn get_transaction_returns_valid_once_majority_votes_in() {
        let store = temp_store("get_tx");
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let tx = create_tx(&owner);
        let txid = tx.id.clone();
        let block = voted_block(&store, &node, tx, 1);

        let query = Query::new(&store);
        let (_, before_vote) = query.get_transaction(&txid).unwrap().unwrap();
        assert_eq!(before_vote, TransactionStatus::Undecided);

        let vote = bigchain_consensus::cast_vote(&block, block.id.clone(), true, None, &node).unwrap();
        bigchain_consensus::write_vote(&store, &block.id, vote, Durability::Hard).unwrap();

        let (_, status) = query.get_transaction(&txid).unwrap().unwrap();
        assert_eq!(status, TransactionStatus::Valid);
    }

    #[test]
    fn owned_ids_lists_conditions_for_owner() {
        let store = temp_store("owned_ids");
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let tx = create_tx(&owner);
        voted_block(&store, &node, tx, 1);

        let query = Query::new(&store);
        let owned = query.owned_ids(owner.public_key()).unwrap();
        assert_eq!(owned.len(), 1);
    }
}
