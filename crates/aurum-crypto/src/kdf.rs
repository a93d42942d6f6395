//! Password-based key-encryption-key derivation.
//!
//! The server hands out per-wallet [`KdfParams`] with an algorithm id, a
//! salt, and an opaque cost map. The cost map is passed through verbatim;
//! this module only interprets the keys the named algorithm defines and
//! fills gaps with [`crate::constants::default_costs`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::constants::{default_costs, ALG_ARGON2ID_V1, ALG_SCRYPT_V1, KEK_SIZE};
use crate::errors::{CryptoError, Result};

/// Key derivation parameters, fetched from the server per login attempt.
///
/// Immutable once fetched for a given attempt; an in-flight login owns its
/// own copy so a concurrent password change cannot mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Algorithm id, e.g. `"scrypt-v1"`.
    pub algorithm: String,
    /// Per-wallet salt.
    pub salt: Vec<u8>,
    /// Opaque cost parameters, interpreted per algorithm.
    #[serde(default)]
    pub cost: BTreeMap<String, u32>,
}

impl KdfParams {
    /// Standard parameters for a freshly registered wallet.
    pub fn new_scrypt(salt: Vec<u8>) -> Self {
        let mut cost = BTreeMap::new();
        cost.insert("n".to_string(), default_costs::SCRYPT_LOG_N);
        cost.insert("r".to_string(), default_costs::SCRYPT_R);
        cost.insert("p".to_string(), default_costs::SCRYPT_P);
        Self {
            algorithm: ALG_SCRYPT_V1.to_string(),
            salt,
            cost,
        }
    }

    fn cost_or(&self, key: &str, default: u32) -> u32 {
        self.cost.get(key).copied().unwrap_or(default)
    }
}

/// Derive the 32-byte key-encryption key from a password.
///
/// The normalized login is appended to the salt so two users with the same
/// password and a colliding salt still derive distinct keys.
///
/// Deterministic: identical `(password, login, params)` always yield the
/// same KEK, on any device.
pub fn derive_kek(
    password: &str,
    login: &str,
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEK_SIZE]>> {
    let mut salt = Vec::with_capacity(params.salt.len() + login.len());
    salt.extend_from_slice(&params.salt);
    salt.extend_from_slice(login.as_bytes());

    let mut kek = Zeroizing::new([0u8; KEK_SIZE]);

    match params.algorithm.as_str() {
        ALG_SCRYPT_V1 => {
            let log_n = params.cost_or("n", default_costs::SCRYPT_LOG_N);
            let r = params.cost_or("r", default_costs::SCRYPT_R);
            let p = params.cost_or("p", default_costs::SCRYPT_P);

            let log_n = u8::try_from(log_n)
                .map_err(|_| CryptoError::InvalidKdfParams(format!("scrypt n={log_n}")))?;
            let scrypt_params = scrypt::Params::new(log_n, r, p, KEK_SIZE)
                .map_err(|e| CryptoError::InvalidKdfParams(format!("scrypt: {e}")))?;

            scrypt::scrypt(password.as_bytes(), &salt, &scrypt_params, kek.as_mut())
                .map_err(|_| CryptoError::KdfFailed)?;
        }
        ALG_ARGON2ID_V1 => {
            use argon2::{Algorithm, Argon2, Params, Version};

            let m = params.cost_or("m", default_costs::ARGON2_M);
            let t = params.cost_or("t", default_costs::ARGON2_T);
            let p = params.cost_or("p", default_costs::ARGON2_P);

            let argon_params = Params::new(m, t, p, Some(KEK_SIZE))
                .map_err(|e| CryptoError::InvalidKdfParams(format!("argon2id: {e}")))?;
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

            argon2
                .hash_password_into(password.as_bytes(), &salt, kek.as_mut())
                .map_err(|_| CryptoError::KdfFailed)?;
        }
        other => {
            return Err(CryptoError::InvalidKdfParams(format!(
                "unknown algorithm id {other:?}"
            )));
        }
    }

    Ok(kek)
}
