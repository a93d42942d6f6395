//! Outbound API request signing.
//!
//! Every authenticated call carries an Ed25519 signature over
//! `timestamp \n METHOD \n uri \n hex(sha256(body))`, which authenticates
//! the caller and bounds replay to the server's timestamp-skew window.

use aurum_crypto::{sign_bytes, verify_bytes, CryptoError, Ed25519KeyPair, PUBLIC_KEY_SIZE};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

use crate::error::{ClientError, Result};

/// Header carrying the request timestamp (Unix seconds, decimal).
pub const HEADER_TIMESTAMP: &str = "x-auth-timestamp";
/// Header carrying the base64 Ed25519 signature.
pub const HEADER_SIGNATURE: &str = "x-auth-signature";
/// Header identifying the signer by hex public key.
pub const HEADER_PUBLIC_KEY: &str = "x-auth-public-key";

/// A signed request descriptor. Built fresh per outbound call, never
/// cached or persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: String,
    pub uri: String,
    pub timestamp: u64,
    /// Hex sha256 of the request body (empty body hashes too).
    pub body_hash: String,
    /// Base64 Ed25519 signature over the canonical payload.
    pub signature: String,
    /// Hex public key of the signer.
    pub public_key: String,
}

impl SignedRequest {
    /// The header set the transport attaches to the call.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (HEADER_TIMESTAMP, self.timestamp.to_string()),
            (HEADER_SIGNATURE, self.signature.clone()),
            (HEADER_PUBLIC_KEY, self.public_key.clone()),
        ]
    }
}

fn canonical_payload(method: &str, uri: &str, timestamp: u64, body_hash: &str) -> Vec<u8> {
    format!("{timestamp}\n{method}\n{uri}\n{body_hash}").into_bytes()
}

/// Sign a request descriptor.
///
/// Pure and synchronous; a failure here would be a programming error, not
/// a runtime condition, so the signature itself is infallible.
pub fn sign_request(
    keypair: &Ed25519KeyPair,
    method: &str,
    uri: &str,
    body: &[u8],
    timestamp: u64,
) -> SignedRequest {
    let method = method.to_uppercase();
    let body_hash = hex::encode(Sha256::digest(body));
    let payload = canonical_payload(&method, uri, timestamp, &body_hash);
    let signature = sign_bytes(keypair, &payload);

    SignedRequest {
        method,
        uri: uri.to_string(),
        timestamp,
        body_hash,
        signature: STANDARD.encode(signature),
        public_key: hex::encode(keypair.public_key_bytes()),
    }
}

/// Verify a signed request against its embedded public key.
pub fn verify_signed_request(request: &SignedRequest) -> Result<()> {
    let key_bytes = hex::decode(&request.public_key)
        .map_err(|_| ClientError::Crypto(CryptoError::MalformedKey("public key hex".into())))?;
    let public_key: [u8; PUBLIC_KEY_SIZE] = key_bytes
        .try_into()
        .map_err(|_| ClientError::Crypto(CryptoError::MalformedKey("public key length".into())))?;
    let signature = STANDARD
        .decode(&request.signature)
        .map_err(|_| ClientError::Crypto(CryptoError::MalformedKey("signature base64".into())))?;

    let payload = canonical_payload(
        &request.method,
        &request.uri,
        request.timestamp,
        &request.body_hash,
    );
    verify_bytes(&public_key, &payload, &signature)?;
    Ok(())
}
