//! Common utility functions for wallet cryptographic operations.

use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
///
/// Single source of truth for timestamps across the wallet core; request
/// signing and transaction time bounds both use it.
///
/// # Panics
///
/// Panics if the system time is set before the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time is before Unix epoch")
        .as_secs()
}

/// Generate cryptographically secure random bytes.
///
/// # Example
///
/// ```
/// use aurum_crypto::generate_random_bytes;
///
/// let nonce: [u8; 24] = generate_random_bytes();
/// let seed: [u8; 32] = generate_random_bytes();
/// ```
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        assert!(ts > 1_600_000_000, "Timestamp should be after Sep 2020");
    }

    #[test]
    fn test_generate_random_bytes_different() {
        let a: [u8; 32] = generate_random_bytes();
        let b: [u8; 32] = generate_random_bytes();
        assert_ne!(a, b, "Random bytes should be different");
    }
}
