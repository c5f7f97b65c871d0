use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;
use crate::types::{BlockId, PubKey, Signature, Timestamp};
use crate::vote::Vote;

/// The structural body of a block, hashed to produce `id` and signed by its
/// creator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub node_pubkey: PubKey,
    /// Full federation membership including the creator, fixed at
    /// block-creation time.
    pub voters: Vec<PubKey>,
}

/// A block as stored in the `bigchain` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub block: BlockBody,
    pub signature: Signature,
    pub votes: Vec<Vote>,
    /// Assigned on first vote write; absent until then. Advisory only —
    /// never a cross-node total order (see the concurrency design notes).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block_number: Option<u64>,
}

impl Block {
    pub fn has_vote_from(&self, node_pubkey: &PubKey) -> Option<&Vote> {
        self.votes.iter().find(|v| &v.node_pubkey == node_pubkey)
    }
}
