//! Core domain types shared across the client.

use std::fmt;
use std::str::FromStr;

use aurum_crypto::{normalize_login, EncryptedKeyMaterial, KdfParams, PUBLIC_KEY_SIZE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::ClientError;

/// A user's password, wiped from memory on drop and redacted in debug
/// output. Never serialized or persisted.
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Ephemeral login credentials. The login is case-normalized on
/// construction; the password lives only as long as this value.
#[derive(Debug)]
pub struct LoginCredentials {
    login: String,
    password: Password,
}

impl LoginCredentials {
    pub fn new(login: &str, password: Password) -> Self {
        Self {
            login: normalize_login(login),
            password,
        }
    }

    /// Normalized login.
    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &Password {
        &self.password
    }
}

/// Ledger account identifier: the hex encoding of a 32-byte Ed25519 public
/// key. Construction is checked, so a held `AccountId` always parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Derive the account id for a public key.
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(hex::encode(public_key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw public key bytes this id encodes.
    pub fn to_public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let mut key = [0u8; PUBLIC_KEY_SIZE];
        // Infallible: the constructor validated the encoding.
        hex::decode_to_slice(&self.0, &mut key).expect("validated account id");
        key
    }
}

impl FromStr for AccountId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|_| ClientError::InvalidOperation(format!("account id is not hex: {s:?}")))?;
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(ClientError::InvalidOperation(format!(
                "account id must encode {PUBLIC_KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(s.to_lowercase()))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ledger network configuration, fetched from the server once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network passphrase mixed into every transaction signing payload.
    pub passphrase: String,
    /// Maximum transaction lifetime in seconds (upper time bound offset).
    pub tx_expiration_period: u64,
}

/// Local record of one enrolled wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub account_id: AccountId,
    /// Normalized login.
    pub login: String,
    pub wallet_id: Uuid,
    pub key_material: EncryptedKeyMaterial,
    pub kdf_params: KdfParams,
    pub network: NetworkConfig,
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_debug_redacted() {
        let password = Password::new("Secret123!");
        assert_eq!(format!("{password:?}"), "Password(<redacted>)");
    }

    #[test]
    fn test_credentials_normalize_login() {
        let creds = LoginCredentials::new(" Alice@Example.COM", Password::new("pw"));
        assert_eq!(creds.login(), "alice@example.com");
    }

    #[test]
    fn test_account_id_roundtrip() {
        let key = [0x5a; 32];
        let id = AccountId::from_public_key(&key);
        assert_eq!(id.to_public_key(), key);
        let parsed: AccountId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_account_id_rejects_bad_input() {
        assert!("not-hex".parse::<AccountId>().is_err());
        assert!(hex::encode([0u8; 16]).parse::<AccountId>().is_err());
    }

    #[test]
    fn test_account_id_serde_is_checked() {
        let ok: AccountId = serde_json::from_str(&format!("\"{}\"", hex::encode([1u8; 32]))).unwrap();
        assert_eq!(ok.to_public_key(), [1u8; 32]);
        let bad: Result<AccountId, _> = serde_json::from_str("\"zz\"");
        assert!(bad.is_err());
    }
}
