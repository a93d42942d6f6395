//! Wallet key material: the deterministic credentials → key pairs mapping.
//!
//! A wallet's signing seeds live server-side (and in the local secret
//! store) as an XChaCha20-Poly1305 blob. The decryption key is derived from
//! the user's password via [`crate::kdf::derive_kek`], so possession of the
//! password is the only way to open the blob. Decrypted plaintext is a
//! concatenation of 32-byte Ed25519 seeds; most wallets carry exactly one.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::constants::{DOMAIN_KEY_MATERIAL, SEED_SIZE};
use crate::encryption;
use crate::errors::{CryptoError, Result};
use crate::kdf::{derive_kek, KdfParams};
use crate::keys::Ed25519KeyPair;

/// Encrypted wallet key material (nonce-prefixed AEAD blob).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyMaterial {
    /// `nonce || ciphertext` as produced by [`seal_key_material`].
    pub ciphertext: Vec<u8>,
}

/// Canonical login form used for key derivation and account lookups.
///
/// Derivation binds the login into the KDF salt and the AEAD associated
/// data, so every caller must agree on one spelling.
pub fn normalize_login(login: &str) -> String {
    login.trim().to_lowercase()
}

fn key_material_aad(login: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(DOMAIN_KEY_MATERIAL.len() + login.len());
    aad.extend_from_slice(DOMAIN_KEY_MATERIAL.as_bytes());
    aad.extend_from_slice(login.as_bytes());
    aad
}

/// Derive the wallet's key pairs from login credentials.
///
/// Deterministic and side-effect free: identical inputs always yield the
/// same key pairs, independent of call order or process restarts.
///
/// # Errors
///
/// - [`CryptoError::InvalidKdfParams`] — unrecognized algorithm id or bad
///   cost parameters.
/// - [`CryptoError::DecryptionFailed`] — the password-derived key cannot
///   open the material (wrong password).
/// - [`CryptoError::MalformedKeyMaterial`] — decrypted bytes are not a
///   non-empty sequence of 32-byte seeds.
pub fn derive_wallet_keys(
    login: &str,
    password: &str,
    key_material: &EncryptedKeyMaterial,
    kdf_params: &KdfParams,
) -> Result<Vec<Ed25519KeyPair>> {
    let login = normalize_login(login);
    let kek = derive_kek(password, &login, kdf_params)?;

    let plaintext = Zeroizing::new(encryption::open(
        &kek,
        &key_material.ciphertext,
        &key_material_aad(&login),
    )?);

    if plaintext.is_empty() || plaintext.len() % SEED_SIZE != 0 {
        return Err(CryptoError::MalformedKeyMaterial);
    }

    let mut key_pairs = Vec::with_capacity(plaintext.len() / SEED_SIZE);
    for chunk in plaintext.chunks_exact(SEED_SIZE) {
        let mut seed = [0u8; SEED_SIZE];
        seed.copy_from_slice(chunk);
        let keypair = Ed25519KeyPair::from_seed(&seed);
        seed.zeroize();
        key_pairs.push(keypair?);
    }
    Ok(key_pairs)
}

/// Encrypt signing seeds under a password: the inverse of
/// [`derive_wallet_keys`], used by registration and password change.
///
/// A fresh random nonce is used per call, so the ciphertext differs between
/// calls even for identical inputs; derivation from any one output is still
/// deterministic.
pub fn seal_key_material(
    login: &str,
    password: &str,
    seeds: &[[u8; SEED_SIZE]],
    kdf_params: &KdfParams,
) -> Result<EncryptedKeyMaterial> {
    if seeds.is_empty() {
        return Err(CryptoError::MalformedKeyMaterial);
    }

    let login = normalize_login(login);
    let kek = derive_kek(password, &login, kdf_params)?;

    let mut plaintext = Zeroizing::new(Vec::with_capacity(seeds.len() * SEED_SIZE));
    for seed in seeds {
        plaintext.extend_from_slice(seed);
    }

    let ciphertext = encryption::seal(&kek, &plaintext, &key_material_aad(&login))?;
    Ok(EncryptedKeyMaterial { ciphertext })
}
