//! End-to-end login protocol tests against an in-process mock backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aurum_client::api::{
    login_path, CreateWalletRequest, KdfBundle, LoginGrant, SubmitReceipt, UpdateWalletRequest,
    WalletBackend,
};
use aurum_client::{
    verify_signed_request, AccountId, ClientError, LoginCoordinator, LoginCredentials, LoginFlow,
    LoginStep, MemoryBackend, NetworkConfig, Password, SecretStore, SignedRequest,
    TransactionEnvelope,
};
use aurum_crypto::{seal_key_material, verify_bytes, Ed25519KeyPair, KdfParams};
use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

const LOGIN: &str = "alice@example.com";
const PASSWORD: &str = "Secret123!";
const VERIFICATION_TOKEN: &str = "123456";
const TFA_TOKEN: &str = "tfa-challenge-token";

struct MockBackend {
    network: NetworkConfig,
    wallet_id: Uuid,
    bundle: Mutex<KdfBundle>,
    wallet_public_key: Mutex<[u8; 32]>,
    require_verification: AtomicBool,
    verified: AtomicBool,
    require_tfa: AtomicBool,
    tfa_solved: AtomicBool,
    login_requests: Mutex<Vec<SignedRequest>>,
}

impl MockBackend {
    fn new() -> (Arc<Self>, Ed25519KeyPair) {
        let keypair = Ed25519KeyPair::from_seed(&[0xab; 32]).unwrap();
        let kdf_params = KdfParams::new_scrypt(vec![0x01; 16]);
        let key_material =
            seal_key_material(LOGIN, PASSWORD, &[keypair.seed_bytes()], &kdf_params).unwrap();
        let wallet_id = Uuid::new_v4();

        let backend = Arc::new(Self {
            network: NetworkConfig {
                passphrase: "Aurum Test Network ; 2026".to_string(),
                tx_expiration_period: 3600,
            },
            wallet_id,
            bundle: Mutex::new(KdfBundle {
                wallet_id,
                kdf_params,
                key_material,
            }),
            wallet_public_key: Mutex::new(keypair.public_key_bytes()),
            require_verification: AtomicBool::new(false),
            verified: AtomicBool::new(false),
            require_tfa: AtomicBool::new(false),
            tfa_solved: AtomicBool::new(false),
            login_requests: Mutex::new(Vec::new()),
        });
        (backend, keypair)
    }

    fn recorded_login_requests(&self) -> Vec<SignedRequest> {
        self.login_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletBackend for MockBackend {
    async fn get_network_info(&self) -> Result<NetworkConfig, ClientError> {
        Ok(self.network.clone())
    }

    async fn get_kdf_params(
        &self,
        login: &str,
        _is_recovery: bool,
    ) -> Result<KdfBundle, ClientError> {
        if login != LOGIN {
            return Err(ClientError::NoSuchAccount);
        }
        Ok(self.bundle.lock().unwrap().clone())
    }

    async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<(), ClientError> {
        *self.bundle.lock().unwrap() = KdfBundle {
            wallet_id: request.wallet_id,
            kdf_params: request.kdf_params.clone(),
            key_material: request.key_material.clone(),
        };
        *self.wallet_public_key.lock().unwrap() = request.account_id.to_public_key();
        self.require_verification.store(true, Ordering::SeqCst);
        self.verified.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn update_wallet(
        &self,
        wallet_id: Uuid,
        request: &UpdateWalletRequest,
        signed: SignedRequest,
    ) -> Result<(), ClientError> {
        verify_signed_request(&signed)?;
        let expected = hex::encode(*self.wallet_public_key.lock().unwrap());
        if signed.public_key != expected {
            return Err(ClientError::WrongPassword);
        }
        let mut bundle = self.bundle.lock().unwrap();
        bundle.wallet_id = wallet_id;
        bundle.kdf_params = request.kdf_params.clone();
        bundle.key_material = request.key_material.clone();
        Ok(())
    }

    async fn login_wallet(
        &self,
        wallet_id: Uuid,
        signed: SignedRequest,
    ) -> Result<LoginGrant, ClientError> {
        self.login_requests.lock().unwrap().push(signed.clone());

        verify_signed_request(&signed)?;
        if signed.uri != login_path(wallet_id) {
            return Err(ClientError::WrongPassword);
        }
        let expected = hex::encode(*self.wallet_public_key.lock().unwrap());
        if signed.public_key != expected {
            return Err(ClientError::WrongPassword);
        }

        if self.require_verification.load(Ordering::SeqCst) && !self.verified.load(Ordering::SeqCst)
        {
            return Err(ClientError::WalletUnverified { wallet_id });
        }
        if self.require_tfa.load(Ordering::SeqCst) && !self.tfa_solved.load(Ordering::SeqCst) {
            return Err(ClientError::TfaRequired {
                token: TFA_TOKEN.to_string(),
            });
        }
        Ok(LoginGrant { wallet_id })
    }

    async fn verify_wallet(&self, _wallet_id: Uuid, token: &str) -> Result<(), ClientError> {
        if token != VERIFICATION_TOKEN {
            return Err(ClientError::ServerError(422, "bad token".to_string()));
        }
        self.verified.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resend_verification(&self, _wallet_id: Uuid) -> Result<(), ClientError> {
        Ok(())
    }

    async fn submit_tfa(&self, token: &str, signature: &str) -> Result<(), ClientError> {
        let raw = STANDARD
            .decode(signature)
            .map_err(|_| ClientError::TfaFailed("bad signature encoding".to_string()))?;
        let public_key = *self.wallet_public_key.lock().unwrap();
        verify_bytes(&public_key, token.as_bytes(), &raw)
            .map_err(|_| ClientError::TfaFailed("signature rejected".to_string()))?;
        self.tfa_solved.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn submit_transaction(
        &self,
        _envelope: &TransactionEnvelope,
        signed: SignedRequest,
    ) -> Result<SubmitReceipt, ClientError> {
        verify_signed_request(&signed)?;
        Ok(SubmitReceipt {
            tx_hash: "deadbeef".to_string(),
            ledger: 42,
        })
    }
}

fn setup() -> (Arc<MockBackend>, Arc<SecretStore>, LoginCoordinator, Ed25519KeyPair) {
    let (backend, keypair) = MockBackend::new();
    let store = Arc::new(SecretStore::new(Box::new(MemoryBackend::new()), [0x07; 32]));
    let coordinator = LoginCoordinator::new(backend.clone(), Arc::clone(&store));
    (backend, store, coordinator, keypair)
}

fn credentials(password: &str) -> LoginCredentials {
    LoginCredentials::new(LOGIN, Password::new(password))
}

fn assert_authenticated(flow: &LoginFlow, keypair: &Ed25519KeyPair) {
    let expected = AccountId::from_public_key(&keypair.public_key_bytes());
    assert_eq!(
        flow.step(),
        &LoginStep::Authenticated {
            account_id: expected
        }
    );
}

#[tokio::test]
async fn login_happy_path_commits_keys() {
    let (_backend, store, coordinator, keypair) = setup();

    let flow = coordinator.login(credentials(PASSWORD)).await.unwrap();
    assert_authenticated(&flow, &keypair);

    let account_id = flow.account_id();
    let (record, keys) = store.load(&account_id).unwrap().unwrap();
    assert_eq!(record.login, LOGIN);
    assert!(record.verified);
    assert_eq!(keys[0].seed_bytes(), keypair.seed_bytes());
}

#[tokio::test]
async fn wrong_password_fails_without_touching_store() {
    let (_backend, store, coordinator, keypair) = setup();

    let err = coordinator.login(credentials("wrong")).await.unwrap_err();
    assert_eq!(err, ClientError::WrongPassword);

    let account_id = AccountId::from_public_key(&keypair.public_key_bytes());
    assert!(store.load(&account_id).unwrap().is_none());
}

#[tokio::test]
async fn unknown_login_is_no_such_account() {
    let (_backend, _store, coordinator, _keypair) = setup();

    let creds = LoginCredentials::new("nobody@example.com", Password::new(PASSWORD));
    let err = coordinator.login(creds).await.unwrap_err();
    assert_eq!(err, ClientError::NoSuchAccount);
}

#[tokio::test]
async fn verification_resumes_with_the_same_key_pair() {
    let (backend, store, coordinator, keypair) = setup();
    backend.require_verification.store(true, Ordering::SeqCst);

    let mut flow = coordinator.login(credentials(PASSWORD)).await.unwrap();
    assert_eq!(
        flow.step(),
        &LoginStep::AwaitingVerification {
            wallet_id: backend.wallet_id
        }
    );
    assert!(store.load(&flow.account_id()).unwrap().is_none());

    coordinator
        .confirm_verification(&mut flow, VERIFICATION_TOKEN)
        .await
        .unwrap();
    assert_authenticated(&flow, &keypair);

    // Both authentication requests must come from the pre-suspension key
    // pair: no re-derivation across the suspension.
    let requests = backend.recorded_login_requests();
    assert_eq!(requests.len(), 2);
    let expected_key = hex::encode(keypair.public_key_bytes());
    for request in &requests {
        assert_eq!(request.public_key, expected_key);
        verify_signed_request(request).unwrap();
    }
}

#[tokio::test]
async fn tfa_failure_keeps_flow_suspended_then_succeeds() {
    let (backend, _store, coordinator, keypair) = setup();
    backend.require_tfa.store(true, Ordering::SeqCst);

    let mut flow = coordinator.login(credentials(PASSWORD)).await.unwrap();
    assert_eq!(flow.step(), &LoginStep::AwaitingTfa);

    // Wrong password cannot open the key material, so the challenge
    // signature is never produced; the flow does not advance.
    let err = coordinator
        .submit_tfa(&mut flow, Password::new("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Crypto(_)));
    assert_eq!(flow.step(), &LoginStep::AwaitingTfa);

    coordinator
        .submit_tfa(&mut flow, Password::new(PASSWORD))
        .await
        .unwrap();
    assert_authenticated(&flow, &keypair);
}

#[tokio::test]
async fn dropping_a_suspended_flow_cancels_cleanly() {
    let (backend, store, coordinator, keypair) = setup();
    backend.require_tfa.store(true, Ordering::SeqCst);

    let flow = coordinator.login(credentials(PASSWORD)).await.unwrap();
    let account_id = flow.account_id();
    drop(flow);

    // Nothing persisted, and the in-flight slot is free again.
    assert!(store.load(&account_id).unwrap().is_none());
    backend.require_tfa.store(false, Ordering::SeqCst);
    let flow = coordinator.login(credentials(PASSWORD)).await.unwrap();
    assert_authenticated(&flow, &keypair);
}

#[tokio::test]
async fn concurrent_attempt_for_same_login_is_rejected() {
    let (backend, _store, coordinator, _keypair) = setup();
    backend.require_tfa.store(true, Ordering::SeqCst);

    let _suspended = coordinator.login(credentials(PASSWORD)).await.unwrap();
    let err = coordinator.login(credentials(PASSWORD)).await.unwrap_err();
    assert_eq!(err, ClientError::AttemptInProgress);
}

#[tokio::test]
async fn registration_suspends_until_verified() {
    let (backend, store, coordinator, _keypair) = setup();

    let creds = LoginCredentials::new(LOGIN, Password::new("NewSecret456!"));
    let mut flow = coordinator.register(creds).await.unwrap();
    assert!(matches!(
        flow.step(),
        LoginStep::AwaitingVerification { .. }
    ));
    assert!(backend.require_verification.load(Ordering::SeqCst));

    coordinator
        .confirm_verification(&mut flow, VERIFICATION_TOKEN)
        .await
        .unwrap();
    assert!(matches!(flow.step(), LoginStep::Authenticated { .. }));
    assert!(store.load(&flow.account_id()).unwrap().is_some());
}

#[tokio::test]
async fn change_password_reseals_and_old_password_stops_working() {
    let (_backend, _store, coordinator, keypair) = setup();

    let account_id = coordinator
        .change_password(credentials(PASSWORD), Password::new("Rotated789!"))
        .await
        .unwrap();
    assert_eq!(
        account_id,
        AccountId::from_public_key(&keypair.public_key_bytes())
    );

    let err = coordinator.login(credentials(PASSWORD)).await.unwrap_err();
    assert_eq!(err, ClientError::WrongPassword);

    let flow = coordinator
        .login(LoginCredentials::new(LOGIN, Password::new("Rotated789!")))
        .await
        .unwrap();
    assert_authenticated(&flow, &keypair);
}

#[tokio::test]
async fn storage_failure_is_fatal_to_the_attempt() {
    struct FailingBackend;
    impl aurum_client::SecretBackend for FailingBackend {
        fn put(&self, _key: &str, _value: &[u8]) -> Result<(), ClientError> {
            Err(ClientError::Storage("disk full".to_string()))
        }
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, ClientError> {
            Ok(None)
        }
        fn delete(&self, _key: &str) -> Result<(), ClientError> {
            Ok(())
        }
        fn clear(&self) -> Result<(), ClientError> {
            Ok(())
        }
    }

    let (backend, _store, _coordinator, _keypair) = setup();
    let store = Arc::new(SecretStore::new(Box::new(FailingBackend), [0x07; 32]));
    let coordinator = LoginCoordinator::new(backend, store);

    let err = coordinator.login(credentials(PASSWORD)).await.unwrap_err();
    assert!(matches!(err, ClientError::Storage(_)));
}

#[tokio::test]
async fn sign_out_clears_the_account() {
    let (_backend, store, coordinator, _keypair) = setup();

    let flow = coordinator.login(credentials(PASSWORD)).await.unwrap();
    let account_id = flow.account_id();
    drop(flow);

    assert!(store.load(&account_id).unwrap().is_some());
    coordinator.sign_out(&account_id).unwrap();
    assert!(store.load(&account_id).unwrap().is_none());
}
