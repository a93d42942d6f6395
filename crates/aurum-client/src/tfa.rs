//! Two-factor challenge signing.
//!
//! TFA proves live possession of the password: the challenge is signed
//! with a key pair re-derived from the password on the spot, never with a
//! key loaded from the secret store. The derived pair exists only inside
//! [`solve_challenge`] and is wiped when it returns.

use aurum_crypto::{derive_wallet_keys, sign_bytes, EncryptedKeyMaterial, KdfParams};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{ClientError, Result};
use crate::types::LoginCredentials;

/// Sign a server-issued TFA challenge token.
///
/// # Errors
///
/// - [`ClientError::NoCredentials`] — login or derivation parameters are
///   unavailable.
/// - [`ClientError::Crypto`] — wrapping the underlying derivation error
///   (a wrong password surfaces as `Crypto(DecryptionFailed)`).
pub fn solve_challenge(
    token: &str,
    credentials: &LoginCredentials,
    kdf_params: &KdfParams,
    key_material: &EncryptedKeyMaterial,
) -> Result<String> {
    if credentials.login().is_empty() || kdf_params.salt.is_empty() {
        return Err(ClientError::NoCredentials);
    }

    let key_pairs = derive_wallet_keys(
        credentials.login(),
        credentials.password().expose(),
        key_material,
        kdf_params,
    )
    .map_err(ClientError::Crypto)?;

    // The raw token bytes are the signed message; the pair drops (and
    // wipes) at the end of this scope.
    let signature = sign_bytes(&key_pairs[0], token.as_bytes());
    Ok(STANDARD.encode(signature))
}
