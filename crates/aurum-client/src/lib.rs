//! # aurum-client
//!
//! Authentication and transaction-signing core for the Aurum wallet:
//! deterministic credential → key derivation (via `aurum-crypto`),
//! encrypted local key storage, replay-safe request signing, ledger
//! transaction envelopes, and the resumable login protocol (password,
//! wallet verification, TFA).
//!
//! This crate is a library consumed by an application shell; it exposes
//! no UI or CLI surface. The remote ledger backend is consumed through
//! the [`api::WalletBackend`] trait, the platform secure storage through
//! [`store::SecretBackend`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod api;
pub mod error;
pub mod login;
pub mod request_signer;
pub mod store;
pub mod tfa;
pub mod tx;
pub mod types;

pub use error::ClientError;
pub use login::{LoginCoordinator, LoginFlow, LoginStep};
pub use request_signer::{sign_request, verify_signed_request, SignedRequest};
pub use store::{FsBackend, MemoryBackend, SecretBackend, SecretStore};
pub use tfa::solve_challenge;
pub use tx::{Operation, TimeBounds, TransactionEnvelope, TransactionSigner, TxSignature};
pub use types::{AccountId, LoginCredentials, NetworkConfig, Password, WalletRecord};
