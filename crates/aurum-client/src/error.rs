use std::fmt;
use std::time::Duration;

use aurum_crypto::CryptoError;
use uuid::Uuid;

/// Errors surfaced by the wallet client core.
///
/// Three behavioral groups:
/// - credential errors end the attempt and are shown to the user;
/// - challenge errors (`WalletUnverified`, `TfaRequired`) are resumable
///   suspensions, not terminal failures;
/// - transport errors leave state unchanged so the caller may retry with
///   identical inputs. The core itself never retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    // Network
    ServerUnreachable,
    Timeout,
    RateLimited { retry_after: Duration },
    ServerError(u16, String),
    NotFound(String),
    Conflict(String),

    // Credentials
    WrongPassword,
    NoSuchAccount,

    // Challenges (resumable)
    WalletUnverified { wallet_id: Uuid },
    TfaRequired { token: String },
    TfaFailed(String),

    // Local
    Storage(String),
    Crypto(CryptoError),
    InvalidOperation(String),
    NoCredentials,
    AttemptInProgress,
    InvalidState(String),
}

impl ClientError {
    /// Whether this error suspends the login flow rather than ending it.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Self::WalletUnverified { .. } | Self::TfaRequired { .. }
        )
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerUnreachable => write!(f, "Cannot reach the wallet server. Check your connection."),
            Self::Timeout => write!(f, "Request timed out. Please try again."),
            Self::RateLimited { retry_after } => write!(f, "Too many requests. Please wait {} seconds.", retry_after.as_secs()),
            Self::ServerError(code, msg) => write!(f, "Server error ({code}): {msg}"),
            Self::NotFound(resource) => write!(f, "{resource} not found."),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::WrongPassword => write!(f, "Incorrect password. Please try again."),
            Self::NoSuchAccount => write!(f, "No wallet exists for this login."),
            Self::WalletUnverified { .. } => write!(f, "Wallet must be verified before signing in. Check your email or SMS."),
            Self::TfaRequired { .. } => write!(f, "Two-factor authentication is required to continue."),
            Self::TfaFailed(msg) => write!(f, "Two-factor authentication failed: {msg}"),
            Self::Storage(msg) => write!(f, "Storage error: {msg}"),
            Self::Crypto(err) => write!(f, "Cryptographic operation failed: {err}"),
            Self::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
            Self::NoCredentials => write!(f, "Login credentials or derivation parameters are unavailable."),
            Self::AttemptInProgress => write!(f, "A login attempt for this account is already in progress."),
            Self::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<CryptoError> for ClientError {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ServerUnreachable
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                404 => Self::NotFound(err.to_string()),
                409 => Self::Conflict(err.to_string()),
                429 => Self::RateLimited {
                    retry_after: Duration::from_secs(30),
                },
                code => Self::ServerError(code, err.to_string()),
            }
        } else {
            Self::ServerUnreachable
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resumable_classification() {
        assert!(ClientError::WalletUnverified { wallet_id: Uuid::nil() }.is_resumable());
        assert!(ClientError::TfaRequired { token: "t".into() }.is_resumable());
        assert!(!ClientError::WrongPassword.is_resumable());
        assert!(!ClientError::Timeout.is_resumable());
    }

    #[test]
    fn test_display_has_no_token_material() {
        let err = ClientError::TfaRequired { token: "opaque-challenge".into() };
        assert!(!err.to_string().contains("opaque-challenge"));
    }
}
