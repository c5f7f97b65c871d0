use std::path::Path;

use bigchain_core::types::{BlockId, PayloadHash, PubKey, Timestamp, TxId};
use bigchain_core::{BacklogTransaction, Block, LedgerError, Transaction, Vote};

use crate::durability::Durability;

/// Sled-backed store adapter over the two logical collections the ledger
/// core operates on: `backlog` (pending transactions awaiting inclusion in
/// a block) and `bigchain` (decided blocks). Secondary indexes are kept as
/// separate trees keyed `index_value || primary_id`, scanned with
/// `scan_prefix` the way sled is meant to be used for non-primary lookups.
///
/// Named trees:
///   backlog              — txid bytes            → json(BacklogTransaction)
///   backlog_by_assignee   — assignee bytes || txid → []            (index)
///   bigchain              — block id bytes         → json(Block)
///   tx_to_block           — txid bytes || block id  → []            (index)
///   payload_hash_to_tx    — payload hash || txid     → []            (index)
///   tx_timestamp          — block ts be || tx ts be || txid → block id bytes (index)
///   meta                  — utf8 key bytes           → raw bytes
pub struct StoreAdapter {
    db: sled::Db,
    backlog: sled::Tree,
    backlog_by_assignee: sled::Tree,
    bigchain: sled::Tree,
    tx_to_block: sled::Tree,
    payload_hash_to_tx: sled::Tree,
    tx_timestamp: sled::Tree,
    meta: sled::Tree,
}

fn storage_err(e: sled::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

// Documents are serialized as JSON rather than bincode: every `Transaction`/
// `Block` carries an opaque `Payload(serde_json::Value)`, and `Value`'s
// `Deserialize` impl relies on `deserialize_any`, which bincode's
// non-self-describing format does not implement. JSON round-trips it
// losslessly, at the cost of a larger on-disk encoding than a fully bincode
// schema would give a payload-free store.
fn ser<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    serde_json::to_vec(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn de<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
}

impl StoreAdapter {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db = sled::open(path).map_err(storage_err)?;
        Ok(Self {
            backlog: db.open_tree("backlog").map_err(storage_err)?,
            backlog_by_assignee: db.open_tree("backlog_by_assignee").map_err(storage_err)?,
            bigchain: db.open_tree("bigchain").map_err(storage_err)?,
            tx_to_block: db.open_tree("tx_to_block").map_err(storage_err)?,
            payload_hash_to_tx: db.open_tree("payload_hash_to_tx").map_err(storage_err)?,
            tx_timestamp: db.open_tree("tx_timestamp").map_err(storage_err)?,
            meta: db.open_tree("meta").map_err(storage_err)?,
            db,
        })
    }

    fn commit(&self, durability: Durability) -> Result<(), LedgerError> {
        if durability == Durability::Hard {
            self.db.flush().map_err(storage_err)?;
        }
        Ok(())
    }

    // ── Backlog ──────────────────────────────────────────────────────────────

    pub fn put_backlog_transaction(
        &self,
        tx: &BacklogTransaction,
        durability: Durability,
    ) -> Result<(), LedgerError> {
        self.backlog
            .insert(tx.id.as_bytes(), ser(tx)?)
            .map_err(storage_err)?;
        let mut index_key = tx.assignee.as_bytes().to_vec();
        index_key.extend_from_slice(tx.id.as_bytes());
        self.backlog_by_assignee
            .insert(index_key, &[])
            .map_err(storage_err)?;
        self.commit(durability)
    }

    pub fn get_backlog_transaction(&self, id: &TxId) -> Result<Option<BacklogTransaction>, LedgerError> {
        match self.backlog.get(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove a transaction from `backlog`, e.g. once it has been written
    /// into a block. Idempotent.
    pub fn remove_backlog_transaction(&self, tx: &BacklogTransaction) -> Result<(), LedgerError> {
        self.backlog.remove(tx.id.as_bytes()).map_err(storage_err)?;
        let mut index_key = tx.assignee.as_bytes().to_vec();
        index_key.extend_from_slice(tx.id.as_bytes());
        self.backlog_by_assignee
            .remove(index_key)
            .map_err(storage_err)?;
        Ok(())
    }

    /// All transactions in `backlog` assigned to `assignee`.
    pub fn backlog_for_assignee(&self, assignee: &PubKey) -> Result<Vec<BacklogTransaction>, LedgerError> {
        let mut out = Vec::new();
        for item in self.backlog_by_assignee.scan_prefix(assignee.as_bytes()) {
            let (key, _) = item.map_err(storage_err)?;
            let txid_bytes = &key[assignee.as_bytes().len()..];
            let mut arr = [0u8; 32];
            arr.copy_from_slice(txid_bytes);
            if let Some(tx) = self.get_backlog_transaction(&TxId::from_bytes(arr))? {
                out.push(tx);
            }
        }
        Ok(out)
    }

    pub fn iter_backlog(&self) -> Result<Vec<BacklogTransaction>, LedgerError> {
        let mut out = Vec::new();
        for item in self.backlog.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(de(&bytes)?);
        }
        Ok(out)
    }

    // ── Bigchain (decided blocks) ────────────────────────────────────────────

    pub fn put_block(&self, block: &Block, durability: Durability) -> Result<(), LedgerError> {
        self.bigchain
            .insert(block.id.as_bytes(), ser(block)?)
            .map_err(storage_err)?;
        self.index_block_transactions(block)?;
        self.commit(durability)
    }

    fn index_block_transactions(&self, block: &Block) -> Result<(), LedgerError> {
        for tx in &block.block.transactions {
            let mut tx_block_key = tx.id.as_bytes().to_vec();
            tx_block_key.extend_from_slice(block.id.as_bytes());
            self.tx_to_block.insert(tx_block_key, &[]).map_err(storage_err)?;

            if let Some(hash) = payload_hash_of(tx) {
                let mut ph_key = hash.as_bytes().to_vec();
                ph_key.extend_from_slice(tx.id.as_bytes());
                self.payload_hash_to_tx
                    .insert(ph_key, &[])
                    .map_err(storage_err)?;
            }

            // Ordering key is `(block.timestamp, transaction.timestamp)`, not
            // the transaction timestamp alone: two transactions with the same
            // timestamp sort by the block that settled them first.
            let mut ts_key = block.block.timestamp.to_be_bytes().to_vec();
            ts_key.extend_from_slice(&tx.transaction.timestamp.to_be_bytes());
            ts_key.extend_from_slice(tx.id.as_bytes());
            self.tx_timestamp
                .insert(ts_key, block.id.as_bytes())
                .map_err(storage_err)?;
        }
        Ok(())
    }

    pub fn get_block(&self, id: &BlockId) -> Result<Option<Block>, LedgerError> {
        match self.bigchain.get(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn iter_blocks(&self) -> Result<Vec<Block>, LedgerError> {
        let mut out = Vec::new();
        for item in self.bigchain.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(de(&bytes)?);
        }
        Ok(out)
    }

    pub fn block_count(&self) -> u64 {
        self.bigchain.len() as u64
    }

    /// Every block containing a transaction with this id (expected to be at
    /// most one `VALID` block; more indicates ledger corruption, which is a
    /// query-layer concern, not a store one).
    pub fn blocks_containing_tx(&self, txid: &TxId) -> Result<Vec<Block>, LedgerError> {
        let mut out = Vec::new();
        for item in self.tx_to_block.scan_prefix(txid.as_bytes()) {
            let (key, _) = item.map_err(storage_err)?;
            let block_id_bytes = &key[txid.as_bytes().len()..];
            let mut arr = [0u8; 32];
            arr.copy_from_slice(block_id_bytes);
            if let Some(block) = self.get_block(&BlockId::from_bytes(arr))? {
                out.push(block);
            }
        }
        Ok(out)
    }

    /// Every transaction anywhere in `bigchain` whose payload hashes to
    /// `hash`.
    pub fn tx_by_payload_hash(&self, hash: &PayloadHash) -> Result<Vec<Transaction>, LedgerError> {
        let mut out = Vec::new();
        for item in self.payload_hash_to_tx.scan_prefix(hash.as_bytes()) {
            let (key, _) = item.map_err(storage_err)?;
            let txid_bytes = &key[hash.as_bytes().len()..];
            let mut arr = [0u8; 32];
            arr.copy_from_slice(txid_bytes);
            let txid = TxId::from_bytes(arr);
            for block in self.blocks_containing_tx(&txid)? {
                if let Some(tx) = block.block.transactions.into_iter().find(|t| t.id == txid) {
                    out.push(tx);
                }
            }
        }
        Ok(out)
    }

    /// All transactions in `bigchain` in ascending timestamp order, each
    /// paired with the block that contains it.
    pub fn transactions_by_timeorder(&self) -> Result<Vec<(Transaction, BlockId)>, LedgerError> {
        let mut out = Vec::new();
        for item in self.tx_timestamp.iter() {
            let (key, block_id_bytes) = item.map_err(storage_err)?;
            let txid_bytes = &key[16..];
            let mut txid_arr = [0u8; 32];
            txid_arr.copy_from_slice(txid_bytes);
            let txid = TxId::from_bytes(txid_arr);

            let mut block_arr = [0u8; 32];
            block_arr.copy_from_slice(&block_id_bytes);
            let block_id = BlockId::from_bytes(block_arr);

            if let Some(block) = self.get_block(&block_id)? {
                if let Some(tx) = block.block.transactions.iter().find(|t| t.id == txid) {
                    out.push((tx.clone(), block_id));
                }
            }
        }
        Ok(out)
    }

    // ── Votes ────────────────────────────────────────────────────────────────

    /// Append `vote` to a block's vote list and, on its very first vote,
    /// assign a sequential `block_number`. Assignment races with concurrent
    /// voters on the same block are tolerated — the ledger treats
    /// `block_number` as advisory ordering, never a cross-node total order.
    pub fn append_vote(
        &self,
        block_id: &BlockId,
        vote: Vote,
        durability: Durability,
    ) -> Result<(), LedgerError> {
        let mut block = self
            .get_block(block_id)?
            .ok_or_else(|| LedgerError::InvalidTransaction(format!("unknown block {block_id}")))?;

        if block.has_vote_from(&vote.node_pubkey).is_some() {
            return Ok(());
        }

        if block.block_number.is_none() {
            block.block_number = Some(self.next_block_number()?);
        }
        block.votes.push(vote);

        self.bigchain
            .insert(block.id.as_bytes(), ser(&block)?)
            .map_err(storage_err)?;
        self.commit(durability)
    }

    fn next_block_number(&self) -> Result<u64, LedgerError> {
        let key = b"next_block_number";
        let current = match self.meta.get(key).map_err(storage_err)? {
            Some(bytes) => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        self.meta
            .insert(key.as_ref(), (current + 1).to_be_bytes().to_vec())
            .map_err(storage_err)?;
        Ok(current)
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }
}

fn payload_hash_of(tx: &Transaction) -> Option<PayloadHash> {
    bigchain_crypto::hash_value(&tx.transaction.data.payload).ok()
}
