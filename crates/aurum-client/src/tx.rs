//! Ledger transaction envelopes: building, signing, verification.
//!
//! An envelope is built from a sealed operation list, signed over a
//! canonical byte encoding bound to the network passphrase, and submitted
//! by the backend. Signing is append-only so multi-signature flows can add
//! signers without disturbing existing signatures.

use aurum_crypto::{sign_bytes, verify_bytes, Ed25519KeyPair, PUBLIC_KEY_SIZE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ClientError, Result};
use crate::types::{AccountId, NetworkConfig};

/// Canonical payload format version.
const PAYLOAD_VERSION: u8 = 0x01;

/// Validity window of a transaction, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

/// A single ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Move `amount` of `asset` to `destination`.
    Payment {
        destination: AccountId,
        asset: String,
        amount: u64,
    },
    /// Create a ledger account with an initial role.
    CreateAccount { destination: AccountId, role: u32 },
    /// Change the source account's role.
    ChangeAccountRole { role: u32 },
}

impl Operation {
    fn validate(&self) -> Result<()> {
        match self {
            Self::Payment { asset, amount, .. } => {
                if *amount == 0 {
                    return Err(ClientError::InvalidOperation(
                        "payment amount must be positive".to_string(),
                    ));
                }
                if asset.is_empty() {
                    return Err(ClientError::InvalidOperation(
                        "payment asset code is empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::CreateAccount { .. } | Self::ChangeAccountRole { .. } => Ok(()),
        }
    }

    fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            Self::Payment {
                destination,
                asset,
                amount,
            } => {
                out.push(0x01);
                out.extend_from_slice(&destination.to_public_key());
                out.extend_from_slice(&(asset.len() as u32).to_be_bytes());
                out.extend_from_slice(asset.as_bytes());
                out.extend_from_slice(&amount.to_be_bytes());
            }
            Self::CreateAccount { destination, role } => {
                out.push(0x02);
                out.extend_from_slice(&destination.to_public_key());
                out.extend_from_slice(&role.to_be_bytes());
            }
            Self::ChangeAccountRole { role } => {
                out.push(0x03);
                out.extend_from_slice(&role.to_be_bytes());
            }
        }
    }
}

/// One signature on an envelope, self-contained for independent
/// re-verification after a serialize/deserialize round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    /// Hex public key of the signer.
    pub public_key: String,
    /// Base64 is avoided here; signatures travel as hex like account ids.
    pub signature: String,
}

/// A signed, submittable transaction. Operations are sealed at
/// construction; only the signature set may grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    source_account: AccountId,
    sequence: u64,
    time_bounds: TimeBounds,
    operations: Vec<Operation>,
    signatures: Vec<TxSignature>,
}

impl TransactionEnvelope {
    pub fn source_account(&self) -> &AccountId {
        &self.source_account
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn time_bounds(&self) -> TimeBounds {
        self.time_bounds
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn signatures(&self) -> &[TxSignature] {
        &self.signatures
    }

    /// Canonical signing payload, bound to the network so an envelope
    /// signed for a test network cannot replay on the public one.
    fn signing_payload(&self, network: &NetworkConfig) -> Vec<u8> {
        let network_id: [u8; 32] = Sha256::digest(network.passphrase.as_bytes()).into();

        let mut out = Vec::with_capacity(64 + self.operations.len() * 48);
        out.push(PAYLOAD_VERSION);
        out.extend_from_slice(&network_id);
        out.extend_from_slice(&self.source_account.to_public_key());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.time_bounds.min_time.to_be_bytes());
        out.extend_from_slice(&self.time_bounds.max_time.to_be_bytes());
        out.extend_from_slice(&(self.operations.len() as u32).to_be_bytes());
        for op in &self.operations {
            op.write_canonical(&mut out);
        }
        out
    }

    /// Add a signature without touching existing ones.
    pub fn append_signature(&mut self, keypair: &Ed25519KeyPair, network: &NetworkConfig) {
        let payload = self.signing_payload(network);
        let signature = sign_bytes(keypair, &payload);
        self.signatures.push(TxSignature {
            public_key: hex::encode(keypair.public_key_bytes()),
            signature: hex::encode(signature),
        });
    }

    /// Re-verify every signature independently against the canonical
    /// payload. Holds across serde round-trips.
    pub fn verify_signatures(&self, network: &NetworkConfig) -> Result<()> {
        if self.signatures.is_empty() {
            return Err(ClientError::InvalidOperation(
                "envelope has no signatures".to_string(),
            ));
        }
        let payload = self.signing_payload(network);
        for sig in &self.signatures {
            let key_bytes = hex::decode(&sig.public_key)
                .ok()
                .and_then(|b| <[u8; PUBLIC_KEY_SIZE]>::try_from(b).ok())
                .ok_or_else(|| {
                    ClientError::InvalidOperation("malformed signer public key".to_string())
                })?;
            let signature = hex::decode(&sig.signature).map_err(|_| {
                ClientError::InvalidOperation("malformed signature encoding".to_string())
            })?;
            verify_bytes(&key_bytes, &payload, &signature)?;
        }
        Ok(())
    }
}

/// Builds and signs transaction envelopes for one network.
#[derive(Debug, Clone)]
pub struct TransactionSigner {
    network: NetworkConfig,
}

impl TransactionSigner {
    pub fn new(network: NetworkConfig) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Validate the operation list, seal it into an envelope, and sign.
    ///
    /// Either a fully signed, consistent envelope comes out, or an
    /// [`ClientError::InvalidOperation`] — never a partially-signed one.
    pub fn build_and_sign(
        &self,
        source_account: AccountId,
        operations: Vec<Operation>,
        keypair: &Ed25519KeyPair,
        send_time: u64,
        sequence: u64,
    ) -> Result<TransactionEnvelope> {
        if operations.is_empty() {
            return Err(ClientError::InvalidOperation(
                "operation list is empty".to_string(),
            ));
        }
        for op in &operations {
            op.validate()?;
        }

        let max_time = send_time
            .checked_add(self.network.tx_expiration_period)
            .ok_or_else(|| {
                ClientError::InvalidOperation("transaction time bounds overflow".to_string())
            })?;

        let mut envelope = TransactionEnvelope {
            source_account,
            sequence,
            time_bounds: TimeBounds {
                min_time: send_time,
                max_time,
            },
            operations,
            signatures: Vec::new(),
        };
        envelope.append_signature(keypair, &self.network);
        Ok(envelope)
    }
}
