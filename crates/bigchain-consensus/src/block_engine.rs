use bigchain_core::types::PubKey;
use bigchain_core::{Block, BlockBody, LedgerError, Transaction, Vote, VoteBody};
use bigchain_crypto::{canonical_bytes, hash_value, verify, KeyPair};
use bigchain_store::{Durability, StoreAdapter};
use bigchain_tx::{validate_transaction, InputResolver};

use crate::federation::Federation;

/// Create a block proposing `transactions`, signed by `node`. `voters` is
/// `federation ∪ {node}` — the creator is always a voter even if the caller's
/// `federation` omits it (e.g. a keyring listing only peers). Refuses an
/// empty transaction list — a block must carry at least one transaction.
pub fn create_block(
    transactions: Vec<Transaction>,
    node: &KeyPair,
    federation: &Federation,
) -> Result<Block, LedgerError> {
    if transactions.is_empty() {
        return Err(LedgerError::EmptyBlock);
    }

    let mut voters = federation.members().to_vec();
    if !voters.contains(node.public_key()) {
        voters.push(node.public_key().clone());
    }

    let body = BlockBody {
        timestamp: bigchain_core::now_unix(),
        transactions,
        node_pubkey: node.public_key().clone(),
        voters,
    };
    let id = hash_value(&body)?;
    let signature = node.sign(&canonical_bytes(&body)?);

    Ok(Block {
        id,
        block: body,
        signature,
        votes: vec![],
        block_number: None,
    })
}

/// Structural validation of a block: recomputed id, and a valid creator
/// signature over its body. Does not validate the transactions it carries
/// — that is the transaction engine's job, run per-transaction by the
/// caller against a store-backed resolver.
pub fn validate_block_structure(block: &Block) -> Result<(), LedgerError> {
    let expected_id = hash_value(&block.block)?;
    if expected_id != block.id {
        return Err(LedgerError::InvalidHash);
    }
    let body_bytes = canonical_bytes(&block.block)?;
    verify(&block.block.node_pubkey, &body_bytes, &block.signature)
        .map_err(|_| LedgerError::InvalidSignature)
}

/// Full validation of a block: structural integrity plus every transaction
/// it carries, checked against `resolver` for double-spends and ownership.
/// Idempotent per `self_pubkey`: if [`has_previous_vote`] reports this node
/// already voted on `block`, the block is returned unchanged (`Ok(())`)
/// rather than re-run through transaction validation.
pub fn validate_block<R: InputResolver>(
    block: &Block,
    self_pubkey: &PubKey,
    resolver: &R,
) -> Result<(), LedgerError> {
    if has_previous_vote(block, self_pubkey)? {
        return Ok(());
    }
    validate_block_structure(block)?;
    for tx in &block.block.transactions {
        validate_transaction(tx, resolver)?;
    }
    Ok(())
}

/// Whether `node_pubkey` has already cast a vote on `block`.
///
/// Three outcomes: no prior vote (`Ok(false)`); a prior vote whose own
/// signature verifies (`Ok(true)`); a prior vote present but with a broken
/// signature — a protocol-level anomaly this node must not silently
/// overwrite or ignore (`Err(ImproperVote)`).
pub fn has_previous_vote(block: &Block, node_pubkey: &PubKey) -> Result<bool, LedgerError> {
    match block.has_vote_from(node_pubkey) {
        None => Ok(false),
        Some(vote) => {
            if verify_vote_signature(vote).is_ok() {
                Ok(true)
            } else {
                Err(LedgerError::ImproperVote {
                    block_id: block.id.to_hex(),
                    node_pubkey: node_pubkey.to_b58(),
                })
            }
        }
    }
}

/// Build this node's signed vote on `block`.
pub fn cast_vote(
    block: &Block,
    previous_block: bigchain_core::BlockId,
    is_block_valid: bool,
    invalid_reason: Option<String>,
    node: &KeyPair,
) -> Result<Vote, LedgerError> {
    let body = VoteBody {
        voting_for_block: block.id.clone(),
        previous_block,
        is_block_valid,
        invalid_reason,
        timestamp: bigchain_core::now_unix(),
    };
    let signature = node.sign(&canonical_bytes(&body)?);
    Ok(Vote {
        node_pubkey: node.public_key().clone(),
        signature,
        vote: body,
    })
}

/// Verify a vote's own signature is valid for its claimed voter.
pub fn verify_vote_signature(vote: &Vote) -> Result<(), LedgerError> {
    let body_bytes = canonical_bytes(&vote.vote)?;
    verify(&vote.node_pubkey, &body_bytes, &vote.signature)
        .map_err(|_| LedgerError::InvalidSignature)
}

/// Write a node's vote for `block_id` into the store.
///
/// Idempotent: if this node already has a validly-signed vote on the block,
/// this is a no-op. If this node already has a vote on the block whose
/// signature doesn't verify, that's a protocol anomaly surfaced as
/// `ImproperVote` rather than silently overwritten. The new vote being
/// written is itself also required to carry a valid signature.
pub fn write_vote(
    store: &StoreAdapter,
    block_id: &bigchain_core::BlockId,
    vote: Vote,
    durability: Durability,
) -> Result<(), LedgerError> {
    let block = store
        .get_block(block_id)?
        .ok_or_else(|| LedgerError::InvalidTransaction(format!("unknown block {block_id}")))?;

    if has_previous_vote(&block, &vote.node_pubkey)? {
        return Ok(());
    }

    if verify_vote_signature(&vote).is_err() {
        return Err(LedgerError::ImproperVote {
            block_id: block_id.to_hex(),
            node_pubkey: vote.node_pubkey.to_b58(),
        });
    }
    store.append_vote(block_id, vote, durability)
}

/// Boolean-form validation: same checks as [`validate_block`], collapsing
/// every failure to `false` instead of propagating the error. Mirrors
/// `bigchain_tx::is_valid_transaction`'s boolean/strict split; like that
/// function, it never hides `ChainCorruption` or `ImproperVote` by
/// swallowing them silently — it simply discards the reason string for
/// whichever error actually occurred.
pub fn is_valid_block<R: InputResolver>(block: &Block, self_pubkey: &PubKey, resolver: &R) -> bool {
    validate_block(block, self_pubkey, resolver).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigchain_core::types::Cid;
    use bigchain_core::{Condition, Fulfillment, Operation, Payload, TransactionBody, TransactionData};

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
    fn empty_transactions_rejected() {
        let node = KeyPair::generate();
        let federation = Federation::new(vec![node.public_key().clone()]);
        let result = create_block(vec![], &node, &federation);
        assert!(matches!(result, Err(LedgerError::EmptyBlock)));
    }

    #[test]
    fn created_block_passes_structural_validation() {
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let federation = Federation::new(vec![node.public_key().clone()]);
        let block = create_block(vec![sample_tx(&owner)], &node, &federation).unwrap();
        assert!(validate_block_structure(&block).is_ok());
    }

    #[test]
    fn voters_always_include_the_creator() {
        let node = KeyPair::generate();
        let peer = KeyPair::generate();
        let owner = KeyPair::generate();
        // federation lists only the peer, not the creator itself
        let federation = Federation::new(vec![peer.public_key().clone()]);
        let block = create_block(vec![sample_tx(&owner)], &node, &federation).unwrap();
        assert!(block.block.voters.contains(node.public_key()));
        assert!(block.block.voters.contains(peer.public_key()));
        assert_eq!(block.block.voters.len(), 2);
    }

    #[test]
    fn tampered_block_signature_fails_validation() {
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let federation = Federation::new(vec![node.public_key().clone()]);
        let mut block = create_block(vec![sample_tx(&owner)], &node, &federation).unwrap();
        block.block.timestamp += 1;
        block.id = hash_value(&block.block).unwrap();
        assert!(validate_block_structure(&block).is_err());
    }

    struct NullResolver;
    impl InputResolver for NullResolver {
        fn resolve_condition(&self, _input: &bigchain_core::types::TxInput) -> Option<bigchain_core::Condition> {
            None
        }
        fn is_spent(&self, _input: &bigchain_core::types::TxInput) -> bool {
            false
        }
    }

    fn temp_store(name: &str) -> StoreAdapter {
        let dir = std::env::temp_dir().join(format!("bigchain_block_engine_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        StoreAdapter::open(&dir).expect("open temp store")
    }

    #[test]
    fn write_vote_is_idempotent() {
        let store = temp_store("idempotent_vote");
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let federation = Federation::new(vec![node.public_key().clone()]);
        let block = create_block(vec![sample_tx(&owner)], &node, &federation).unwrap();
        store.put_block(&block, Durability::Hard).unwrap();

        let vote = cast_vote(&block, block.id.clone(), true, None, &node).unwrap();
        write_vote(&store, &block.id, vote.clone(), Durability::Hard).unwrap();
        write_vote(&store, &block.id, vote, Durability::Hard).unwrap();

        let stored = store.get_block(&block.id).unwrap().unwrap();
        assert_eq!(stored.votes.len(), 1);
    }

    #[test]
    fn has_previous_vote_flags_a_broken_stored_signature() {
        let store = temp_store("broken_vote");
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let federation = Federation::new(vec![node.public_key().clone()]);
        let mut block = create_block(vec![sample_tx(&owner)], &node, &federation).unwrap();
        let mut vote = cast_vote(&block, block.id.clone(), true, None, &node).unwrap();
        vote.vote.timestamp += 1; // corrupts the signed body without re-signing
        block.votes.push(vote.clone());

        assert!(matches!(
            has_previous_vote(&block, node.public_key()),
            Err(LedgerError::ImproperVote { .. })
        ));

        store.put_block(&block, Durability::Hard).unwrap();
        let result = write_vote(&store, &block.id, vote, Durability::Hard);
        assert!(matches!(result, Err(LedgerError::ImproperVote { .. })));
    }

    #[test]
    fn validate_block_is_idempotent_once_self_has_voted() {
        let store = temp_store("validate_idempotent");
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let federation = Federation::new(vec![node.public_key().clone()]);
        let block = create_block(vec![sample_tx(&owner)], &node, &federation).unwrap();
        store.put_block(&block, Durability::Hard).unwrap();

        // Unsigned fulfillments would normally fail transaction validation...
        assert!(validate_block(&block, node.public_key(), &NullResolver).is_err());

        // ...but once self has voted, re-validation is skipped entirely.
        let vote = cast_vote(&block, block.id.clone(), true, None, &node).unwrap();
        write_vote(&store, &block.id, vote, Durability::Hard).unwrap();
        let voted_block = store.get_block(&block.id).unwrap().unwrap();
        assert!(validate_block(&voted_block, node.public_key(), &NullResolver).is_ok());
    }

    #[test]
    fn is_valid_block_collapses_errors_to_bool() {
        let node = KeyPair::generate();
        let owner = KeyPair::generate();
        let federation = Federation::new(vec![node.public_key().clone()]);
        // sample_tx's fulfillment is unsigned, so transaction validation fails.
        let block = create_block(vec![sample_tx(&owner)], &node, &federation).unwrap();
        assert!(!is_valid_block(&block, node.public_key(), &NullResolver));
    }
}
