use thiserror::Error;

/// Errors raised across the ledger core: construction, crypto, transaction
/// and block validation, queries, and the currency/asset domain ops.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Construction ─────────────────────────────────────────────────────────
    #[error("no keypair configured for this node")]
    KeypairNotFound,

    // ── Block engine ─────────────────────────────────────────────────────────
    #[error("cannot create a block with zero transactions")]
    EmptyBlock,

    #[error("the genesis block already exists")]
    GenesisBlockAlreadyExists,

    #[error("block {block_id} already has an incorrectly signed vote from {node_pubkey}")]
    ImproperVote { block_id: String, node_pubkey: String },

    // ── Query layer ──────────────────────────────────────────────────────────
    #[error("`{0:?}` was spent more than once across multiple valid blocks")]
    DoubleSpend(crate::types::TxInput),

    #[error("transaction {0} is present in multiple valid blocks")]
    ChainCorruption(String),

    // ── Transaction engine ───────────────────────────────────────────────────
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("balance not enough: need {need}, have {have}")]
    BalanceNotEnough { need: i128, have: i128 },

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("invalid hash")]
    InvalidHash,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("transaction does not exist: {0}")]
    TransactionDoesNotExist(String),

    #[error("transaction owner mismatch")]
    TransactionOwnerError,

    #[error("operation error: {0}")]
    OperationError(String),

    // ── Ambient ──────────────────────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}
