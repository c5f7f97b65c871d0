pub mod block_engine;
pub mod election;
pub mod federation;
pub mod plugin;

pub use block_engine::{
    cast_vote, create_block, has_previous_vote, is_valid_block, validate_block,
    validate_block_structure, verify_vote_signature, write_vote,
};
pub use election::{election_status, ElectionStatus};
pub use federation::Federation;
pub use plugin::{ConsensusPlugin, DefaultConsensusPlugin};
