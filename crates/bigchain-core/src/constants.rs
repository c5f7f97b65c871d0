//! Protocol constants for the ledger core.

/// Length in bytes of an Ed25519 public key.
pub const PUBLIC_KEY_BYTES: usize = 32;

/// Length in bytes of an Ed25519 signature.
pub const SIGNATURE_BYTES: usize = 64;

/// Length in bytes of a sha3-256 content hash.
pub const HASH_BYTES: usize = 32;

/// Operation tags recognized by the transaction engine.
pub const OP_CREATE: &str = "CREATE";
pub const OP_TRANSFER: &str = "TRANSFER";
pub const OP_GENESIS: &str = "GENESIS";

/// Payload category tags recognized by the domain layer.
pub const CATEGORY_CURRENCY: &str = "currency";
pub const CATEGORY_ASSET: &str = "asset";

/// Currency payload `issue` tags.
pub const ISSUE_CHARGE: &str = "charge";
pub const ISSUE_EARN: &str = "earn";
pub const ISSUE_COST: &str = "cost";

/// Asset payload `issue` tags.
pub const ISSUE_CREATE: &str = "create";
pub const ISSUE_TRANSFER: &str = "transfer";
pub const ISSUE_DESTROY: &str = "destroy";

/// Sentinel `previous` value for an owner's first currency transaction.
pub const CURRENCY_GENESIS_SENTINEL: &str = "genesis";

/// Sentinel return value for `last_currency` when the owner has no history.
pub const CURRENCY_INIT_SENTINEL: &str = "init";

/// The fixed payload message written into the genesis transaction.
pub const GENESIS_PAYLOAD_MESSAGE: &str = "Hello World from the BigchainDB";

/// Block number of the genesis block.
pub const GENESIS_BLOCK_NUMBER: u64 = 0;

/// Default store write durability when unspecified.
pub const DEFAULT_DURABILITY: &str = "soft";
