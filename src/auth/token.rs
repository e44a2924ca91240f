//! Access token minting
//!
//! Tokens are random URL-safe strings returned to the client once
//! at registration; only their sha256 digest is persisted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Mint a new plaintext bearer token.
///
/// # Arguments
/// * `bytes` - Entropy in bytes (configuration enforces a minimum)
pub fn mint_access_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_unique_and_url_safe() {
        let a = mint_access_token(32);
        let b = mint_access_token(32);
        assert_ne!(a, b);
        assert!(a
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
        // 32 bytes of entropy encode to 43 base64url characters
        assert_eq!(a.len(), 43);
    }
}
