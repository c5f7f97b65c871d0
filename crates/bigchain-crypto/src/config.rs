use serde::{Deserialize, Serialize};

use bigchain_core::types::PubKey;
use bigchain_core::LedgerError;

use crate::KeyPair;

/// Database connection surface, carried for fidelity with the original
/// store configuration even though this workspace's store adapter is
/// embedded sled rather than a networked database: `host`/`port` are
/// accepted and stored but unused, `name` becomes the store's base
/// directory name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_database_name")]
    pub name: String,
}

fn default_database_name() -> String {
    "bigchain".to_string()
}

/// Base-58 encoded keypair material as it appears in a config file.
/// `public`/`private` may be omitted here and supplied instead via the
/// `BIGCHAIN_PUBLIC_KEY`/`BIGCHAIN_PRIVATE_KEY` environment variables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KeypairConfig {
    #[serde(default)]
    pub public: Option<String>,
    #[serde(default)]
    pub private: Option<String>,
}

/// The ledger's full configuration surface: store location, this node's
/// keypair, the federation keyring, and which consensus plugin to load.
/// Deserializable from TOML or JSON; never a global — callers thread it
/// through explicitly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub keypair: KeypairConfig,
    #[serde(default)]
    pub keyring: Vec<String>,
    #[serde(default)]
    pub consensus_plugin: Option<String>,
}

impl LedgerConfig {
    pub fn from_toml(s: &str) -> Result<Self, LedgerError> {
        toml::from_str(s).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(s).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Resolve this node's keypair, falling through to the
    /// `BIGCHAIN_PUBLIC_KEY`/`BIGCHAIN_PRIVATE_KEY` environment variables
    /// when the config omits it. Fails with `KeypairNotFound` if neither
    /// source supplies both halves, or the private key doesn't decode to
    /// a valid 32-byte Ed25519 seed.
    pub fn resolve_keypair(&self) -> Result<KeyPair, LedgerError> {
        let private = self
            .keypair
            .private
            .clone()
            .or_else(|| std::env::var("BIGCHAIN_PRIVATE_KEY").ok())
            .ok_or(LedgerError::KeypairNotFound)?;

        let seed_bytes = bs58::decode(&private)
            .into_vec()
            .map_err(|_| LedgerError::KeypairNotFound)?;
        let seed: [u8; 32] = seed_bytes
            .try_into()
            .map_err(|_| LedgerError::KeypairNotFound)?;
        let keypair = KeyPair::from_raw(seed);

        if let Some(expected) = self
            .keypair
            .public
            .clone()
            .or_else(|| std::env::var("BIGCHAIN_PUBLIC_KEY").ok())
        {
            let expected = PubKey::from_b58(&expected).map_err(|_| LedgerError::KeypairNotFound)?;
            if &expected != keypair.public_key() {
                return Err(LedgerError::KeypairNotFound);
            }
        }

        Ok(keypair)
    }

    /// The federation's public keys, parsed from `keyring`. Invalid
    /// entries are dropped rather than failing the whole config — a
    /// malformed keyring entry shouldn't prevent a node from starting.
    pub fn federation(&self) -> Vec<PubKey> {
        self.keyring
            .iter()
            .filter_map(|s| PubKey::from_b58(s).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keypair_is_an_error() {
        std::env::remove_var("BIGCHAIN_PRIVATE_KEY");
        let config = LedgerConfig::default();
        assert!(matches!(config.resolve_keypair(), Err(LedgerError::KeypairNotFound)));
    }

    #[test]
    fn config_keypair_round_trips() {
        let kp = KeyPair::generate();
        let config = LedgerConfig {
            keypair: KeypairConfig {
                public: Some(kp.public_key().to_b58()),
                private: Some(bs58::encode(kp.secret_seed()).into_string()),
            },
            ..Default::default()
        };
        let restored = config.resolve_keypair().unwrap();
        assert_eq!(restored.public_key(), kp.public_key());
    }

    #[test]
    fn toml_round_trip_parses_database_section() {
        let toml = r#"
            [database]
            host = "localhost"
            port = 27017
            name = "bigchain_test"
        "#;
        let config = LedgerConfig::from_toml(toml).unwrap();
        assert_eq!(config.database.name, "bigchain_test");
        assert_eq!(config.database.port, Some(27017));
    }
}
