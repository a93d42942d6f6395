//! Authenticated encryption with XChaCha20-Poly1305.
//!
//! Ciphertext layout is `nonce (24 bytes) || AEAD ciphertext (incl. 16-byte
//! tag)`. The associated data binds the ciphertext to its context (wallet
//! login, store account id) so a blob cannot be replayed under another key.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};

use crate::constants::{KEK_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::errors::{CryptoError, Result};
use crate::utils::generate_random_bytes;

/// Encrypt `plaintext` under `key`, binding `aad` into the tag.
///
/// A fresh random nonce is generated and prefixed to the returned buffer.
pub fn seal(key: &[u8; KEK_SIZE], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let nonce: [u8; NONCE_SIZE] = generate_random_bytes();
    seal_with_nonce(key, &nonce, plaintext, aad)
}

/// Encrypt with an explicit nonce. Callers must never reuse a nonce with
/// the same key; prefer [`seal`].
pub fn seal_with_nonce(
    key: &[u8; KEK_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a `nonce || ciphertext` buffer produced by [`seal`].
///
/// Fails with [`CryptoError::DecryptionFailed`] on a wrong key, wrong
/// associated data, or any tampering.
pub fn open(key: &[u8; KEK_SIZE], data: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);

    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}
