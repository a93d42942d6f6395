//! Cryptographic constants and domain separation strings.
//!
//! These are normative for the wallet wire protocol: changing any of them
//! invalidates existing wallets and stored records.

/// Size of Ed25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of Ed25519 signatures in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Size of Ed25519 signing seeds in bytes
pub const SEED_SIZE: usize = 32;

/// Size of XChaCha20-Poly1305 nonces in bytes (192 bits)
pub const NONCE_SIZE: usize = 24;

/// Size of XChaCha20-Poly1305 authentication tags in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the key-encryption key derived from the password
pub const KEK_SIZE: usize = 32;

/// Size of the salt generated for newly registered wallets
pub const KDF_SALT_SIZE: usize = 16;

/// Algorithm id for scrypt-based wallet key derivation
pub const ALG_SCRYPT_V1: &str = "scrypt-v1";

/// Algorithm id for Argon2id-based wallet key derivation
pub const ALG_ARGON2ID_V1: &str = "argon2id-v1";

/// Domain separation for wallet key material encryption
pub const DOMAIN_KEY_MATERIAL: &str = "aurum:wallet:key-material:v1";

/// Domain separation for the local secret store
pub const DOMAIN_SECRET_STORE: &str = "aurum:client:secret-store:v1";

/// Default cost parameters, used when a wallet's opaque cost map omits a key.
///
/// The server's cost map is always passed through verbatim; these only fill
/// gaps, they never override.
pub mod default_costs {
    /// scrypt log2 cost (`n`)
    pub const SCRYPT_LOG_N: u32 = 14;
    /// scrypt block size (`r`)
    pub const SCRYPT_R: u32 = 8;
    /// scrypt parallelism (`p`)
    pub const SCRYPT_P: u32 = 1;

    /// Argon2id memory cost in KiB (`m`): 64 MiB
    pub const ARGON2_M: u32 = 64 * 1024;
    /// Argon2id iterations (`t`)
    pub const ARGON2_T: u32 = 3;
    /// Argon2id parallelism (`p`)
    pub const ARGON2_P: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_correct_sizes() {
        assert_eq!(PUBLIC_KEY_SIZE, 32);
        assert_eq!(SIGNATURE_SIZE, 64);
        assert_eq!(NONCE_SIZE, 24);
        assert_eq!(TAG_SIZE, 16);
    }

    #[test]
    fn test_domain_strings_are_versioned() {
        for d in [DOMAIN_KEY_MATERIAL, DOMAIN_SECRET_STORE] {
            assert!(d.starts_with("aurum:"), "{d} missing aurum: prefix");
            assert!(d.ends_with(":v1"), "{d} missing :v1 version tag");
        }
    }
}
