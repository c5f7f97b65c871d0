pub mod canonical;
pub mod config;
pub mod hash;
pub mod keypair;
pub mod sign;

pub use canonical::canonical_bytes;
pub use config::{DatabaseConfig, KeypairConfig, LedgerConfig};
pub use hash::{hash_value, transaction_id, verify_transaction_id};
pub use keypair::KeyPair;
pub use sign::verify;
