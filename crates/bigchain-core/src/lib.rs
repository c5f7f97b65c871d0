pub mod block;
pub mod constants;
pub mod error;
pub mod payload;
pub mod transaction;
pub mod types;
pub mod util;
pub mod vote;

pub use block::{Block, BlockBody};
pub use error::LedgerError;
pub use payload::Payload;
pub use transaction::{
    BacklogTransaction, Condition, ConditionBody, ConditionDetails, Fulfillment, Operation,
    Transaction, TransactionBody, TransactionData,
};
pub use types::*;
pub use util::now_unix;
pub use vote::{Vote, VoteBody};

/// Whether `owner` owns a condition's output.
///
/// Checks the single-owner and multi-owner cases symmetrically and
/// independently against the same condition, rather than nesting the
/// multi-owner check inside an `else` branch keyed off `new_owners.len()`
/// (an asymmetry in the original ledger's `get_tx_input` that could
/// under-report ownership — see the design notes).
pub fn condition_owned_by(condition: &transaction::Condition, owner: &types::PubKey) -> bool {
    let single_owner_match = condition.new_owners.len() == 1 && condition.new_owners[0] == *owner;
    let multi_owner_match = condition.condition.details.has_owner(owner);
    single_owner_match || multi_owner_match
}
