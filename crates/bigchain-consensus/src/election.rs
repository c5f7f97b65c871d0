use bigchain_core::Block;

use crate::block_engine::verify_vote_signature;

/// A block's current standing among the federation's votes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionStatus {
    Valid,
    Invalid,
    Undecided,
}

/// Tally a block's votes against the federation size recorded on the block
/// itself (`block.block.voters.len()`).
///
/// Only votes whose own signature verifies are counted — a vote with a
/// broken signature neither helps nor hurts the tally. A block becomes
/// `Invalid` as soon as `ceil(n/2)` members vote it invalid — reaching
/// consensus that it can never recover a majority. It becomes `Valid` only
/// once *more than* `floor(n/2)` members vote it valid — a strict
/// majority, not merely half. Everything short of either threshold is
/// `Undecided`. The two thresholds are asymmetric by design: a tie
/// resolves toward `Invalid` rather than `Valid`.
pub fn election_status(block: &Block) -> ElectionStatus {
    let n = block.block.voters.len();
    let signature_valid_votes = block
        .votes
        .iter()
        .filter(|v| verify_vote_signature(v).is_ok());
    let n_invalid = signature_valid_votes
        .clone()
        .filter(|v| !v.vote.is_block_valid)
        .count();
    let n_valid = signature_valid_votes
        .filter(|v| v.vote.is_block_valid)
        .count();

    let invalid_majority = n.div_ceil(2);
    let valid_majority = n / 2;

    if n_invalid >= invalid_majority {
        ElectionStatus::Invalid
    } else if n_valid > valid_majority {
        ElectionStatus::Valid
    } else {
        ElectionStatus::Undecided
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigchain_core::{BlockBody, Vote, VoteBody};
    use bigchain_crypto::KeyPair;

    fn block_with_votes(n_voters: usize, valid_votes: usize, invalid_votes: usize) -> Block {
        let owner = KeyPair::generate();
        let voters: Vec<_> = (0..n_voters).map(|_| KeyPair::generate().public_key().clone()).collect();
        let body = BlockBody {
            timestamp: 0,
            transactions: vec![],
            node_pubkey: owner.public_key().clone(),
            voters,
        };
        let id = bigchain_crypto::hash_value(&body).unwrap();
        let mut votes = Vec::new();
        for i in 0..valid_votes {
            votes.push(make_vote(&id, true, i));
        }
        for i in 0..invalid_votes {
            votes.push(make_vote(&id, false, valid_votes + i));
        }
        Block {
            id,
            block: body,
            signature: owner.sign(b"sig"),
            votes,
            block_number: None,
        }
    }

    fn make_vote(block_id: &bigchain_core::BlockId, is_valid: bool, salt: usize) -> Vote {
        let voter = KeyPair::generate();
        let _ = salt;
        let body = VoteBody {
            voting_for_block: block_id.clone(),
            previous_block: block_id.clone(),
            is_block_valid: is_valid,
            invalid_reason: None,
            timestamp: 0,
        };
        let signature = voter.sign(&bigchain_crypto::canonical_bytes(&body).unwrap());
        Vote {
            node_pubkey: voter.public_key().clone(),
            signature,
            vote: body,
        }
    }

    #[test]
    fn four_voters_needs_strict_majority_for_valid() {
        // n=4: invalid_majority = ceil(4/2) = 2, valid_majority = floor(4/2) = 2
        let undecided = block_with_votes(4, 2, 0);
        assert_eq!(election_status(&undecided), ElectionStatus::Undecided);

        let valid = block_with_votes(4, 3, 0);
        assert_eq!(election_status(&valid), ElectionStatus::Valid);

        let invalid = block_with_votes(4, 0, 2);
        assert_eq!(election_status(&invalid), ElectionStatus::Invalid);
    }

    #[test]
    fn three_voters_ties_resolve_toward_invalid() {
        // n=3: invalid_majority = ceil(3/2) = 2, valid_majority = floor(3/2) = 1
        let one_each = block_with_votes(3, 1, 1);
        assert_eq!(election_status(&one_each), ElectionStatus::Undecided);

        let two_invalid = block_with_votes(3, 1, 2);
        assert_eq!(election_status(&two_invalid), ElectionStatus::Invalid);
    }
}
