//! Builds the very first block of a ledger from scratch: a single `CREATE`
//! transaction carrying a fixed greeting payload, voted valid by its own
//! creator and written with hard durability. Refuses to run a second time.

use std::collections::HashMap;

use bigchain_consensus::{cast_vote, create_block, write_vote, Federation};
use bigchain_core::constants::GENESIS_PAYLOAD_MESSAGE;
use bigchain_core::{now_unix, Block, LedgerError, Operation, Payload, Transaction};
use bigchain_crypto::KeyPair;
use bigchain_store::{Durability, StoreAdapter};
use bigchain_tx::{create_transaction, sign_transaction};
use serde_json::json;
use tracing::info;

/// Apply the genesis block to an empty store. `node` both proposes and
/// casts the sole vote on the block, since no other federation member can
/// exist before it.
///
/// # Errors
/// `GenesisBlockAlreadyExists` if `bigchain` already holds any block.
pub fn apply_genesis(store: &StoreAdapter, node: &KeyPair) -> Result<Block, LedgerError> {
    if store.block_count() > 0 {
        return Err(LedgerError::GenesisBlockAlreadyExists);
    }

    let tx = build_genesis_transaction(node)?;

    let federation = Federation::new(vec![node.public_key().clone()]);
    let block = create_block(vec![tx], node, &federation)?;
    store.put_block(&block, Durability::Hard)?;

    let vote = cast_vote(&block, block.id.clone(), true, None, node)?;
    write_vote(store, &block.id, vote, Durability::Hard)?;

    let block = store
        .get_block(&block.id)?
        .expect("block was just written");
    info!(block_id = %block.id, block_number = ?block.block_number, "genesis block committed");
    Ok(block)
}

fn build_genesis_transaction(node: &KeyPair) -> Result<Transaction, LedgerError> {
    let mut payload = Payload::empty();
    payload.set("message", json!(GENESIS_PAYLOAD_MESSAGE));

    let mut tx = create_transaction(
        Operation::Create,
        vec![vec![node.public_key().clone()]],
        vec![None],
        vec![vec![node.public_key().clone()]],
        payload,
        now_unix(),
    )?;

    let mut keys = HashMap::new();
    keys.insert(node.public_key().clone(), node);
    sign_transaction(&mut tx, &keys)?;
    Ok(tx)
}
