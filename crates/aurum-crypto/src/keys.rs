//! Ed25519 signing key pair.

use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::constants::{PUBLIC_KEY_SIZE, SEED_SIZE};
use crate::errors::Result;
use crate::utils::generate_random_bytes;

/// Ed25519 signing key pair.
///
/// Seed-based and deterministic: the same 32-byte seed always reconstructs
/// the same pair. The inner signing key is wiped on drop.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    private_key: SigningKey,
    public_key: VerifyingKey,
}

impl Ed25519KeyPair {
    /// Reconstruct a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_SIZE]) -> Result<Self> {
        let private_key = SigningKey::from_bytes(seed);
        let public_key = private_key.verifying_key();
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Generate a key pair from a fresh random seed.
    pub fn generate() -> Self {
        let seed: [u8; SEED_SIZE] = generate_random_bytes();
        let private_key = SigningKey::from_bytes(&seed);
        let public_key = private_key.verifying_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// Get the public key bytes.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.to_bytes()
    }

    /// Get the private key seed bytes (32 bytes).
    pub fn seed_bytes(&self) -> [u8; SEED_SIZE] {
        self.private_key.to_bytes()
    }

    /// Get a reference to the private key.
    pub fn private_key(&self) -> &SigningKey {
        &self.private_key
    }

    /// Get a reference to the public key.
    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the seed, even in debug output.
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}
