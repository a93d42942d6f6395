//! # aurum-crypto
//!
//! Cryptographic primitives for the Aurum wallet core: password-based key
//! derivation (scrypt / Argon2id), XChaCha20-Poly1305 encryption of wallet
//! key material, deterministic Ed25519 key pairs, and signature utilities.
//!
//! Everything in this crate is pure and side-effect free. Network and
//! storage concerns live in `aurum-client`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod encryption;
pub mod errors;
pub mod kdf;
pub mod keys;
pub mod signatures;
pub mod utils;
pub mod wallet;

pub use constants::*;
pub use encryption::{open, seal};
pub use errors::CryptoError;
pub use kdf::{derive_kek, KdfParams};
pub use keys::Ed25519KeyPair;
pub use signatures::{sign_bytes, verify_bytes};
pub use utils::{current_timestamp, generate_random_bytes};
pub use wallet::{
    derive_wallet_keys, normalize_login, seal_key_material, EncryptedKeyMaterial,
};
