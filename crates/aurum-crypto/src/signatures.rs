//! Ed25519 signature utilities.

use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};

use crate::constants::{PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use crate::errors::{CryptoError, Result};
use crate::keys::Ed25519KeyPair;

/// Sign a message with an Ed25519 key pair.
pub fn sign_bytes(keypair: &Ed25519KeyPair, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
    keypair.private_key().sign(message).to_bytes()
}

/// Verify an Ed25519 signature against raw public key bytes.
pub fn verify_bytes(
    public_key: &[u8; PUBLIC_KEY_SIZE],
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|_| CryptoError::MalformedKey("invalid Ed25519 public key".to_string()))?;
    let signature = Signature::from_slice(signature)
        .map_err(|_| CryptoError::MalformedKey("invalid Ed25519 signature".to_string()))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = Ed25519KeyPair::from_seed(&[1u8; 32]).unwrap();
        let sig = sign_bytes(&keypair, b"hello ledger");
        verify_bytes(&keypair.public_key_bytes(), b"hello ledger", &sig).unwrap();
    }

    #[test]
    fn test_flipped_message_byte_fails() {
        let keypair = Ed25519KeyPair::from_seed(&[1u8; 32]).unwrap();
        let sig = sign_bytes(&keypair, b"hello ledger");
        let err = verify_bytes(&keypair.public_key_bytes(), b"hello ledgeR", &sig).unwrap_err();
        assert_eq!(err, CryptoError::SignatureInvalid);
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair = Ed25519KeyPair::from_seed(&[1u8; 32]).unwrap();
        let other = Ed25519KeyPair::from_seed(&[2u8; 32]).unwrap();
        let sig = sign_bytes(&keypair, b"hello ledger");
        let err = verify_bytes(&other.public_key_bytes(), b"hello ledger", &sig).unwrap_err();
        assert_eq!(err, CryptoError::SignatureInvalid);
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let keypair = Ed25519KeyPair::from_seed(&[1u8; 32]).unwrap();
        let err = verify_bytes(&keypair.public_key_bytes(), b"msg", &[0u8; 10]).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedKey(_)));
    }
}
