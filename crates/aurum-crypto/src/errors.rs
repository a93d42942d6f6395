//! Error types for cryptographic operations.

/// Errors produced by key derivation, encryption, and signing.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The KDF algorithm id is unrecognized or the cost parameters are
    /// out of range for it.
    #[error("invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// The KDF itself failed to produce output.
    #[error("key derivation failed")]
    KdfFailed,

    /// AEAD authentication failed while opening a ciphertext. For wallet
    /// key material this means the password (and thus the KEK) is wrong.
    #[error("decryption failed")]
    DecryptionFailed,

    /// AEAD encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decrypted key material is not a valid set of signing seeds.
    #[error("malformed key material")]
    MalformedKeyMaterial,

    /// A signature did not verify against the given public key.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// A key or signature had the wrong length or encoding.
    #[error("malformed key: {0}")]
    MalformedKey(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CryptoError>;
