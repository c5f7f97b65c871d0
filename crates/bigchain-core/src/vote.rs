use serde::{Deserialize, Serialize};

use crate::types::{BlockId, PubKey, Signature, Timestamp};

/// The signed content of a vote: which block, the decision, and a pointer to
/// the voter's previous block for their own local chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteBody {
    pub voting_for_block: BlockId,
    pub previous_block: BlockId,
    pub is_block_valid: bool,
    pub invalid_reason: Option<String>,
    pub timestamp: Timestamp,
}

/// One federation member's signed verdict on a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub node_pubkey: PubKey,
    pub signature: Signature,
    pub vote: VoteBody,
}
