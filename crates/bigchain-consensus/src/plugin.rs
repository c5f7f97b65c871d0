use std::collections::HashMap;

use bigchain_core::types::{PubKey, Timestamp, TxInput};
use bigchain_core::{Block, LedgerError, Operation, Payload, Transaction, Vote};
use bigchain_crypto::KeyPair;
use bigchain_tx::InputResolver;

use crate::block_engine;

/// The set of rules a ledger enforces when building and validating
/// transactions, blocks, and votes. The default implementation is exactly
/// `bigchain-tx`/`bigchain-consensus`'s own rules; the trait exists as a
/// seam so an alternative rule set could be swapped in without the engine
/// (block creation, submission, voting) needing to change.
pub trait ConsensusPlugin {
    fn create_transaction(
        &self,
        operation: Operation,
        current_owners: Vec<Vec<PubKey>>,
        inputs: Vec<Option<TxInput>>,
        new_owners: Vec<Vec<PubKey>>,
        payload: Payload,
        timestamp: Timestamp,
    ) -> Result<Transaction, LedgerError>;

    fn sign_transaction(
        &self,
        tx: &mut Transaction,
        keys: &HashMap<PubKey, &KeyPair>,
    ) -> Result<(), LedgerError>;

    fn validate_fulfillments<R: InputResolver>(
        &self,
        tx: &Transaction,
        resolver: &R,
    ) -> Result<(), LedgerError>;

    fn validate_transaction<R: InputResolver>(
        &self,
        tx: &Transaction,
        resolver: &R,
    ) -> Result<(), LedgerError>;

    fn validate_block<R: InputResolver>(
        &self,
        block: &Block,
        self_pubkey: &PubKey,
        resolver: &R,
    ) -> Result<(), LedgerError>;

    fn verify_vote_signature(&self, vote: &Vote) -> Result<(), LedgerError>;
}

/// The rules this workspace ships: signature-and-structural validation as
/// implemented directly in `bigchain-tx`/`bigchain-consensus`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConsensusPlugin;

impl ConsensusPlugin for DefaultConsensusPlugin {
    fn create_transaction(
        &self,
        operation: Operation,
        current_owners: Vec<Vec<PubKey>>,
        inputs: Vec<Option<TxInput>>,
        new_owners: Vec<Vec<PubKey>>,
        payload: Payload,
        timestamp: Timestamp,
    ) -> Result<Transaction, LedgerError> {
        bigchain_tx::create_transaction(operation, current_owners, inputs, new_owners, payload, timestamp)
    }

    fn sign_transaction(
        &self,
        tx: &mut Transaction,
        keys: &HashMap<PubKey, &KeyPair>,
    ) -> Result<(), LedgerError> {
        bigchain_tx::sign_transaction(tx, keys)
    }

    fn validate_fulfillments<R: InputResolver>(
        &self,
        tx: &Transaction,
        resolver: &R,
    ) -> Result<(), LedgerError> {
        bigchain_tx::validate_fulfillments(tx, resolver)
    }

    fn validate_transaction<R: InputResolver>(
        &self,
        tx: &Transaction,
        resolver: &R,
    ) -> Result<(), LedgerError> {
        bigchain_tx::validate_transaction(tx, resolver)
    }

    fn validate_block<R: InputResolver>(
        &self,
        block: &Block,
        self_pubkey: &PubKey,
        resolver: &R,
    ) -> Result<(), LedgerError> {
        block_engine::validate_block(block, self_pubkey, resolver)
    }

    fn verify_vote_signature(&self, vote: &Vote) -> Result<(), LedgerError> {
        block_engine::verify_vote_signature(vote)
    }
}
