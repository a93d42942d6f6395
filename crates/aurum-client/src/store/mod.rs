//! Local secret storage.
//!
//! The [`SecretStore`] is the exclusive owner of derived key material at
//! rest. Records are sealed with XChaCha20-Poly1305 under a store key the
//! platform provides (hardware keystore, OS keychain, or a file-backed key
//! in development) and written through a [`SecretBackend`]. The account id
//! is bound as associated data, so an entry copied between accounts fails
//! to open.

mod fs;

pub use fs::{FsBackend, MemoryBackend};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aurum_crypto::{encryption, Ed25519KeyPair, DOMAIN_SECRET_STORE, KEK_SIZE, SEED_SIZE};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{ClientError, Result};
use crate::types::{AccountId, WalletRecord};

/// Keyed blob storage under the secret store.
///
/// Implementations must make `put` atomic: a reader sees either the old
/// value or the new one, never a partial write.
pub trait SecretBackend: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn delete(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// On-disk shape of one sealed entry (plaintext side).
#[derive(Serialize, Deserialize)]
struct StoredWallet {
    seeds: Vec<Vec<u8>>,
    record: WalletRecord,
}

impl Drop for StoredWallet {
    fn drop(&mut self) {
        for seed in &mut self.seeds {
            seed.zeroize();
        }
    }
}

/// Encrypted, per-account wallet storage.
///
/// Writes are serialized per account id; reads for distinct accounts
/// proceed concurrently.
pub struct SecretStore {
    backend: Box<dyn SecretBackend>,
    store_key: Zeroizing<[u8; KEK_SIZE]>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SecretStore {
    /// `store_key` comes from the platform keystore; the store never
    /// derives or persists it itself.
    pub fn new(backend: Box<dyn SecretBackend>, store_key: [u8; KEK_SIZE]) -> Self {
        Self {
            backend,
            store_key: Zeroizing::new(store_key),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn write_lock(&self, account_id: &AccountId) -> Arc<Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(account_id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn entry_aad(account_id: &AccountId) -> Vec<u8> {
        let mut aad = Vec::with_capacity(DOMAIN_SECRET_STORE.len() + account_id.as_str().len());
        aad.extend_from_slice(DOMAIN_SECRET_STORE.as_bytes());
        aad.extend_from_slice(account_id.as_str().as_bytes());
        aad
    }

    /// Encrypt and persist a wallet record with its key pairs, atomically
    /// replacing any existing entry for the account.
    ///
    /// A failure here is fatal to the enclosing login attempt: the caller
    /// must not report the user as logged in.
    pub fn save(&self, record: &WalletRecord, key_pairs: &[Ed25519KeyPair]) -> Result<()> {
        if key_pairs.is_empty() {
            return Err(ClientError::Storage(
                "refusing to store a wallet without key pairs".to_string(),
            ));
        }

        let entry = StoredWallet {
            seeds: key_pairs
                .iter()
                .map(|kp| kp.seed_bytes().to_vec())
                .collect(),
            record: record.clone(),
        };
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&entry)
                .map_err(|e| ClientError::Storage(format!("serialize wallet entry: {e}")))?,
        );
        let sealed = encryption::seal(
            &self.store_key,
            &plaintext,
            &Self::entry_aad(&record.account_id),
        )
        .map_err(|e| ClientError::Storage(format!("seal wallet entry: {e}")))?;

        let lock = self.write_lock(&record.account_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.backend.put(record.account_id.as_str(), &sealed)
    }

    /// Load and decrypt an account's entry. All-or-nothing: a missing
    /// entry is `Ok(None)`, a corrupt or tampered one is an error.
    pub fn load(&self, account_id: &AccountId) -> Result<Option<(WalletRecord, Vec<Ed25519KeyPair>)>> {
        let Some(sealed) = self.backend.get(account_id.as_str())? else {
            return Ok(None);
        };

        let plaintext = Zeroizing::new(
            encryption::open(&self.store_key, &sealed, &Self::entry_aad(account_id)).map_err(
                |_| ClientError::Storage("stored wallet entry failed authentication".to_string()),
            )?,
        );
        let entry: StoredWallet = serde_json::from_slice(&plaintext)
            .map_err(|e| ClientError::Storage(format!("parse wallet entry: {e}")))?;

        let mut key_pairs = Vec::with_capacity(entry.seeds.len());
        for seed_bytes in &entry.seeds {
            let seed: [u8; SEED_SIZE] = seed_bytes.as_slice().try_into().map_err(|_| {
                ClientError::Storage("stored seed has invalid length".to_string())
            })?;
            key_pairs.push(Ed25519KeyPair::from_seed(&seed)?);
        }
        Ok(Some((entry.record.clone(), key_pairs)))
    }

    /// Irreversibly remove one account's entry (sign-out).
    pub fn remove(&self, account_id: &AccountId) -> Result<()> {
        let lock = self.write_lock(account_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.backend.delete(account_id.as_str())
    }

    /// Irreversibly remove every entry.
    pub fn clear(&self) -> Result<()> {
        self.backend.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkConfig;
    use aurum_crypto::{seal_key_material, KdfParams};
    use uuid::Uuid;

    fn store() -> SecretStore {
        SecretStore::new(Box::new(MemoryBackend::new()), [0x42; 32])
    }

    fn record_for(keypair: &Ed25519KeyPair) -> WalletRecord {
        let kdf_params = KdfParams::new_scrypt(vec![1; 16]);
        WalletRecord {
            account_id: AccountId::from_public_key(&keypair.public_key_bytes()),
            login: "alice@example.com".to_string(),
            wallet_id: Uuid::new_v4(),
            key_material: seal_key_material(
                "alice@example.com",
                "pw",
                &[keypair.seed_bytes()],
                &kdf_params,
            )
            .unwrap(),
            kdf_params,
            network: NetworkConfig {
                passphrase: "Aurum Test Network ; 2026".to_string(),
                tx_expiration_period: 3600,
            },
            verified: true,
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = store();
        let keypair = Ed25519KeyPair::from_seed(&[5; 32]).unwrap();
        let record = record_for(&keypair);

        store.save(&record, std::slice::from_ref(&keypair)).unwrap();
        let (loaded, keys) = store.load(&record.account_id).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].seed_bytes(), keypair.seed_bytes());
    }

    #[test]
    fn test_load_absent_is_none() {
        let store = store();
        let absent = AccountId::from_public_key(&[9; 32]);
        assert!(store.load(&absent).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let store = store();
        let keypair = Ed25519KeyPair::from_seed(&[5; 32]).unwrap();
        let mut record = record_for(&keypair);

        store.save(&record, std::slice::from_ref(&keypair)).unwrap();
        record.verified = false;
        store.save(&record, std::slice::from_ref(&keypair)).unwrap();

        let (loaded, _) = store.load(&record.account_id).unwrap().unwrap();
        assert!(!loaded.verified);
    }

    #[test]
    fn test_tampered_entry_is_error_not_none() {
        let backend = MemoryBackend::new();
        let keypair = Ed25519KeyPair::from_seed(&[5; 32]).unwrap();
        let record = record_for(&keypair);
        let account_key = record.account_id.as_str().to_string();

        let store = SecretStore::new(Box::new(backend.clone()), [0x42; 32]);
        store.save(&record, std::slice::from_ref(&keypair)).unwrap();

        let mut sealed = backend.get(&account_key).unwrap().unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        backend.put(&account_key, &sealed).unwrap();

        assert!(matches!(
            store.load(&record.account_id),
            Err(ClientError::Storage(_))
        ));
    }

    #[test]
    fn test_empty_key_pairs_rejected() {
        let store = store();
        let keypair = Ed25519KeyPair::from_seed(&[5; 32]).unwrap();
        let record = record_for(&keypair);
        assert!(matches!(
            store.save(&record, &[]),
            Err(ClientError::Storage(_))
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let store = store();
        let keypair = Ed25519KeyPair::from_seed(&[5; 32]).unwrap();
        let record = record_for(&keypair);

        store.save(&record, std::slice::from_ref(&keypair)).unwrap();
        store.remove(&record.account_id).unwrap();
        assert!(store.load(&record.account_id).unwrap().is_none());

        store.save(&record, std::slice::from_ref(&keypair)).unwrap();
        store.clear().unwrap();
        assert!(store.load(&record.account_id).unwrap().is_none());
    }
}
