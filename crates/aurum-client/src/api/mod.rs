//! Remote wallet API: the trait the coordinator talks to, and its wire
//! types. The reqwest-backed implementation lives in [`http`].

pub mod http;

use async_trait::async_trait;
use aurum_crypto::{EncryptedKeyMaterial, KdfParams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::request_signer::SignedRequest;
use crate::tx::TransactionEnvelope;
use crate::types::{AccountId, NetworkConfig};

/// KDF parameter fetch response: everything needed to derive the wallet's
/// keys locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfBundle {
    pub wallet_id: Uuid,
    pub kdf_params: KdfParams,
    pub key_material: EncryptedKeyMaterial,
}

/// `POST /wallets` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWalletRequest {
    pub wallet_id: Uuid,
    pub login: String,
    pub account_id: AccountId,
    pub kdf_params: KdfParams,
    pub key_material: EncryptedKeyMaterial,
}

/// `PUT /wallets/{id}` body: re-sealed key material after a password
/// change or recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWalletRequest {
    pub kdf_params: KdfParams,
    pub key_material: EncryptedKeyMaterial,
}

/// Successful authentication response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginGrant {
    pub wallet_id: Uuid,
}

/// Accepted transaction submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub tx_hash: String,
    pub ledger: u64,
}

/// Request path for wallet login; signed requests must cover the exact
/// path the transport sends.
pub fn login_path(wallet_id: Uuid) -> String {
    format!("/wallets/{wallet_id}/login")
}

/// Request path for wallet update (password change / recovery).
pub fn wallet_path(wallet_id: Uuid) -> String {
    format!("/wallets/{wallet_id}")
}

/// Request path for transaction submission.
pub fn transactions_path() -> String {
    "/transactions".to_string()
}

/// The remote ledger backend, as consumed by the wallet core.
///
/// Methods that require authentication take a [`SignedRequest`] built by
/// the caller over the matching path helper; the backend attaches its
/// headers verbatim. Challenge outcomes surface as the resumable errors
/// [`crate::ClientError::WalletUnverified`] and
/// [`crate::ClientError::TfaRequired`].
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Anonymous network configuration fetch.
    async fn get_network_info(&self) -> Result<NetworkConfig>;

    /// Anonymous KDF parameter fetch. Unknown login surfaces as
    /// [`crate::ClientError::NoSuchAccount`]. `is_recovery` requests the
    /// recovery-seed parameters instead of the login ones.
    async fn get_kdf_params(&self, login: &str, is_recovery: bool) -> Result<KdfBundle>;

    /// Register a new wallet (`POST Wallet`).
    async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<()>;

    /// Replace a wallet's key material (`PUT Wallet`), authorized by the
    /// current signing key.
    async fn update_wallet(
        &self,
        wallet_id: Uuid,
        request: &UpdateWalletRequest,
        signed: SignedRequest,
    ) -> Result<()>;

    /// Authenticate with a signed request over [`login_path`].
    async fn login_wallet(&self, wallet_id: Uuid, signed: SignedRequest) -> Result<LoginGrant>;

    /// Confirm wallet ownership with an emailed/SMS token.
    async fn verify_wallet(&self, wallet_id: Uuid, token: &str) -> Result<()>;

    /// Ask the server to resend the verification token.
    async fn resend_verification(&self, wallet_id: Uuid) -> Result<()>;

    /// Answer a TFA challenge with the password-derived signature.
    async fn submit_tfa(&self, token: &str, signature: &str) -> Result<()>;

    /// Submit a signed transaction envelope.
    async fn submit_transaction(
        &self,
        envelope: &TransactionEnvelope,
        signed: SignedRequest,
    ) -> Result<SubmitReceipt>;
}
