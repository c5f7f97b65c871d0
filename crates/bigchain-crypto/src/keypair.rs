use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use bigchain_core::types::{PubKey, Signature};

/// An Ed25519 keypair: a signing key held in memory only as long as needed,
/// wiped on drop, plus the public key derived from it.
pub struct KeyPair {
    public_key: PubKey,
    signing_key_bytes: [u8; 32],
}

impl KeyPair {
    /// Generate a fresh Ed25519 keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Restore a keypair from a raw 32-byte Ed25519 seed (e.g. loaded from a
    /// wallet file).
    pub fn from_raw(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        KeyPair {
            public_key: PubKey::from_bytes(verifying_key.to_bytes()),
            signing_key_bytes: signing_key.to_bytes(),
        }
    }

    pub fn public_key(&self) -> &PubKey {
        &self.public_key
    }

    /// Sign `message` with this keypair's private key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signing_key = SigningKey::from_bytes(&self.signing_key_bytes);
        let sig = signing_key.sign(message);
        Signature::from_bytes(sig.to_bytes())
    }

    /// Raw 32-byte seed, for persisting to a wallet file.
    pub fn secret_seed(&self) -> &[u8; 32] {
        &self.signing_key_bytes
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.signing_key_bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {:?} }}", self.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"hello ledger");
        assert!(crate::sign::verify(kp.public_key(), b"hello ledger", &sig).is_ok());
    }

    #[test]
    fn from_raw_reproduces_same_public_key() {
        let kp = KeyPair::generate();
        let restored = KeyPair::from_raw(*kp.secret_seed());
        assert_eq!(kp.public_key(), restored.public_key());
    }
}
