//! The login protocol, as a resumable state machine.
//!
//! A login attempt runs `FetchingNetworkInfo → FetchingKdfParams →
//! DerivingKeys → AuthenticatingRemote → Committing → Authenticated`, but
//! the server may interrupt authentication with a challenge: the wallet
//! needs email/SMS verification, or a second factor. Those interruptions
//! are driven by out-of-band user action that can take arbitrary real
//! time, so an attempt suspends into a [`LoginFlow`] handle instead of
//! blocking. The handle carries the already-derived key pairs across the
//! suspension; resumption never re-derives them, so each attempt decrypts
//! the key material exactly once.
//!
//! At most one attempt per login is in flight at a time; a second
//! concurrent attempt is rejected with
//! [`ClientError::AttemptInProgress`]. Dropping a flow cancels the
//! attempt: nothing is written to the secret store and the registry slot
//! is released.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use aurum_crypto::{
    current_timestamp, derive_wallet_keys, generate_random_bytes, seal_key_material,
    CryptoError, Ed25519KeyPair, EncryptedKeyMaterial, KdfParams, KDF_SALT_SIZE,
};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::api::{self, CreateWalletRequest, UpdateWalletRequest, WalletBackend};
use crate::error::{ClientError, Result};
use crate::request_signer::sign_request;
use crate::store::SecretStore;
use crate::tfa;
use crate::types::{AccountId, LoginCredentials, NetworkConfig, Password, WalletRecord};

/// Where a login attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// Keys are committed to the secret store; the attempt is complete.
    Authenticated { account_id: AccountId },
    /// The server requires wallet verification (email/SMS). Resume with
    /// [`LoginCoordinator::confirm_verification`] or
    /// [`LoginCoordinator::resume_verified`].
    AwaitingVerification { wallet_id: Uuid },
    /// The server demands a second factor. Resume with
    /// [`LoginCoordinator::submit_tfa`].
    AwaitingTfa,
}

/// Slot in the in-flight registry, released on drop.
struct InFlightGuard {
    login: String,
    registry: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.login);
    }
}

/// A suspended or completed login attempt.
///
/// Owns the key pairs derived before any suspension. Dropping the flow
/// cancels the attempt without touching the secret store.
pub struct LoginFlow {
    login: String,
    wallet_id: Uuid,
    kdf_params: KdfParams,
    key_material: EncryptedKeyMaterial,
    network: NetworkConfig,
    key_pairs: Vec<Ed25519KeyPair>,
    tfa_token: Option<String>,
    step: LoginStep,
    _guard: InFlightGuard,
}

impl LoginFlow {
    pub fn step(&self) -> &LoginStep {
        &self.step
    }

    pub fn wallet_id(&self) -> Uuid {
        self.wallet_id
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Account id of the wallet's primary key pair.
    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key(&self.key_pairs[0].public_key_bytes())
    }
}

impl std::fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow")
            .field("wallet_id", &self.wallet_id)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

/// Orchestrates login, registration, and recovery against the remote
/// backend and the local secret store.
pub struct LoginCoordinator {
    backend: Arc<dyn WalletBackend>,
    store: Arc<SecretStore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl LoginCoordinator {
    pub fn new(backend: Arc<dyn WalletBackend>, store: Arc<SecretStore>) -> Self {
        Self {
            backend,
            store,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    fn acquire(&self, login: &str) -> Result<InFlightGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(login.to_string()) {
            return Err(ClientError::AttemptInProgress);
        }
        Ok(InFlightGuard {
            login: login.to_string(),
            registry: Arc::clone(&self.in_flight),
        })
    }

    /// Run a login attempt until it authenticates or suspends.
    ///
    /// Consumes the credentials; the password is derived from once and
    /// wiped before this returns. Inspect [`LoginFlow::step`] on the
    /// returned handle: `Authenticated` means keys are committed,
    /// otherwise the flow is waiting on verification or TFA.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<LoginFlow> {
        let login = credentials.login().to_string();
        let guard = self.acquire(&login)?;

        tracing::debug!(login_domain = login_domain(&login), "login attempt started");
        let network = self.backend.get_network_info().await?;
        let bundle = self.backend.get_kdf_params(&login, false).await?;

        let key_pairs = derive_wallet_keys(
            &login,
            credentials.password().expose(),
            &bundle.key_material,
            &bundle.kdf_params,
        )
        .map_err(|e| match e {
            CryptoError::DecryptionFailed => ClientError::WrongPassword,
            other => ClientError::Crypto(other),
        })?;
        // Password is no longer needed; wipe it before going remote.
        drop(credentials);

        let mut flow = LoginFlow {
            login,
            wallet_id: bundle.wallet_id,
            kdf_params: bundle.kdf_params,
            key_material: bundle.key_material,
            network,
            key_pairs,
            tfa_token: None,
            step: LoginStep::AwaitingVerification {
                wallet_id: bundle.wallet_id,
            },
            _guard: guard,
        };
        self.authenticate(&mut flow).await?;
        Ok(flow)
    }

    /// Submit the signed authentication request and interpret the
    /// outcome. Re-entered on every resumption with the same key pairs.
    async fn authenticate(&self, flow: &mut LoginFlow) -> Result<()> {
        let signed = sign_request(
            &flow.key_pairs[0],
            "POST",
            &api::login_path(flow.wallet_id),
            b"{}",
            current_timestamp(),
        );

        match self.backend.login_wallet(flow.wallet_id, signed).await {
            Ok(grant) => {
                flow.wallet_id = grant.wallet_id;
                self.commit(flow)?;
                flow.step = LoginStep::Authenticated {
                    account_id: flow.account_id(),
                };
                tracing::info!(wallet_id = %flow.wallet_id, "login authenticated");
                Ok(())
            }
            Err(ClientError::WalletUnverified { wallet_id }) => {
                flow.wallet_id = wallet_id;
                flow.step = LoginStep::AwaitingVerification { wallet_id };
                tracing::debug!(wallet_id = %wallet_id, "login suspended: verification required");
                Ok(())
            }
            Err(ClientError::TfaRequired { token }) => {
                flow.tfa_token = Some(token);
                flow.step = LoginStep::AwaitingTfa;
                tracing::debug!(wallet_id = %flow.wallet_id, "login suspended: TFA required");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Durably store the derived keys. Failure here is fatal: the attempt
    /// must not end in `Authenticated` without a successful save.
    fn commit(&self, flow: &LoginFlow) -> Result<()> {
        let record = WalletRecord {
            account_id: flow.account_id(),
            login: flow.login.clone(),
            wallet_id: flow.wallet_id,
            key_material: flow.key_material.clone(),
            kdf_params: flow.kdf_params.clone(),
            network: flow.network.clone(),
            verified: true,
        };
        self.store.save(&record, &flow.key_pairs)
    }

    /// Confirm wallet ownership with the emailed/SMS token, then resume
    /// authentication with the pre-suspension key pair.
    pub async fn confirm_verification(&self, flow: &mut LoginFlow, token: &str) -> Result<()> {
        let LoginStep::AwaitingVerification { wallet_id } = flow.step else {
            return Err(ClientError::InvalidState(
                "flow is not awaiting verification".to_string(),
            ));
        };
        self.backend.verify_wallet(wallet_id, token).await?;
        self.authenticate(flow).await
    }

    /// Resume after verification completed out of band (the user opened
    /// an email link). Uses the key pair derived before suspension.
    pub async fn resume_verified(&self, flow: &mut LoginFlow) -> Result<()> {
        if !matches!(flow.step, LoginStep::AwaitingVerification { .. }) {
            return Err(ClientError::InvalidState(
                "flow is not awaiting verification".to_string(),
            ));
        }
        self.authenticate(flow).await
    }

    /// Ask the server to resend the verification token.
    pub async fn resend_verification(&self, flow: &LoginFlow) -> Result<()> {
        let LoginStep::AwaitingVerification { wallet_id } = flow.step else {
            return Err(ClientError::InvalidState(
                "flow is not awaiting verification".to_string(),
            ));
        };
        self.backend.resend_verification(wallet_id).await
    }

    /// Answer the pending TFA challenge by re-proving the password, then
    /// resume authentication.
    ///
    /// On failure the flow stays in `AwaitingTfa`; the caller decides
    /// whether to retry or drop the flow.
    pub async fn submit_tfa(&self, flow: &mut LoginFlow, password: Password) -> Result<()> {
        if flow.step != LoginStep::AwaitingTfa {
            return Err(ClientError::InvalidState(
                "flow is not awaiting a TFA challenge".to_string(),
            ));
        }
        let token = flow
            .tfa_token
            .clone()
            .ok_or(ClientError::NoCredentials)?;

        let credentials = LoginCredentials::new(&flow.login, password);
        let signature = tfa::solve_challenge(
            &token,
            &credentials,
            &flow.kdf_params,
            &flow.key_material,
        )?;
        self.backend.submit_tfa(&token, &signature).await?;

        flow.tfa_token = None;
        self.authenticate(flow).await
    }

    /// Register a new wallet. The resulting flow suspends in
    /// `AwaitingVerification`: the server will not authenticate the
    /// wallet until its email/SMS channel is confirmed.
    pub async fn register(&self, credentials: LoginCredentials) -> Result<LoginFlow> {
        let login = credentials.login().to_string();
        let guard = self.acquire(&login)?;

        let network = self.backend.get_network_info().await?;

        let keypair = Ed25519KeyPair::generate();
        let kdf_params = KdfParams::new_scrypt(generate_random_bytes::<KDF_SALT_SIZE>().to_vec());
        let mut seed = keypair.seed_bytes();
        let key_material = seal_key_material(
            &login,
            credentials.password().expose(),
            &[seed],
            &kdf_params,
        )?;
        seed.zeroize();
        drop(credentials);

        let wallet_id = Uuid::new_v4();
        let request = CreateWalletRequest {
            wallet_id,
            login: login.clone(),
            account_id: AccountId::from_public_key(&keypair.public_key_bytes()),
            kdf_params: kdf_params.clone(),
            key_material: key_material.clone(),
        };
        self.backend.create_wallet(&request).await?;
        tracing::info!(wallet_id = %wallet_id, "wallet registered, verification pending");

        Ok(LoginFlow {
            login,
            wallet_id,
            kdf_params,
            key_material,
            network,
            key_pairs: vec![keypair],
            tfa_token: None,
            step: LoginStep::AwaitingVerification { wallet_id },
            _guard: guard,
        })
    }

    /// Change the wallet password (also the recovery path): re-derive
    /// with the current credentials, re-seal under the new password with
    /// a fresh salt, and replace the server-side material with a signed
    /// update.
    pub async fn change_password(
        &self,
        credentials: LoginCredentials,
        new_password: Password,
    ) -> Result<AccountId> {
        let login = credentials.login().to_string();
        let _guard = self.acquire(&login)?;

        let bundle = self.backend.get_kdf_params(&login, true).await?;
        let key_pairs = derive_wallet_keys(
            &login,
            credentials.password().expose(),
            &bundle.key_material,
            &bundle.kdf_params,
        )
        .map_err(|e| match e {
            CryptoError::DecryptionFailed => ClientError::WrongPassword,
            other => ClientError::Crypto(other),
        })?;
        drop(credentials);

        let new_params = KdfParams {
            algorithm: bundle.kdf_params.algorithm.clone(),
            salt: generate_random_bytes::<KDF_SALT_SIZE>().to_vec(),
            cost: bundle.kdf_params.cost.clone(),
        };
        let mut seeds: Vec<[u8; 32]> = key_pairs.iter().map(|kp| kp.seed_bytes()).collect();
        let new_material =
            seal_key_material(&login, new_password.expose(), &seeds, &new_params)?;
        for seed in &mut seeds {
            seed.zeroize();
        }
        drop(new_password);

        let request = UpdateWalletRequest {
            kdf_params: new_params.clone(),
            key_material: new_material.clone(),
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| ClientError::InvalidOperation(format!("serialize update: {e}")))?;
        let signed = sign_request(
            &key_pairs[0],
            "PUT",
            &api::wallet_path(bundle.wallet_id),
            &body,
            current_timestamp(),
        );
        self.backend
            .update_wallet(bundle.wallet_id, &request, signed)
            .await?;
        tracing::info!(wallet_id = %bundle.wallet_id, "wallet key material rotated");

        // Refresh the local record if this account is enrolled here.
        let account_id = AccountId::from_public_key(&key_pairs[0].public_key_bytes());
        if let Some((mut record, keys)) = self.store.load(&account_id)? {
            record.kdf_params = new_params;
            record.key_material = new_material;
            self.store.save(&record, &keys)?;
        }
        Ok(account_id)
    }

    /// Sign out: irreversibly drop the account's stored keys.
    pub fn sign_out(&self, account_id: &AccountId) -> Result<()> {
        self.store.remove(account_id)
    }
}

/// Domain part of a login for log lines; the local part is never logged.
fn login_domain(login: &str) -> &str {
    login.split('@').next_back().unwrap_or("")
}
