//! Cryptographic utilities for portal access tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes behind a portal access token.
pub const ACCESS_TOKEN_BYTES: usize = 32;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a random URL-safe access token (43 characters, no padding).
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns a short, log-safe fingerprint of a token.
///
/// Tokens themselves must never be written to logs.
pub fn token_fingerprint(token: &str) -> String {
    sha256_hex(token)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_empty_string() {
        let hash = sha256_hex("");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_unicode() {
        let hash = sha256_hex("保管中");
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_generate_access_token_length() {
        let token = generate_access_token();
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn test_generate_access_token_is_url_safe() {
        let token = generate_access_token();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generate_access_token_unique() {
        let a = generate_access_token();
        let b = generate_access_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_fingerprint_is_stable_and_short() {
        let fp1 = token_fingerprint("abc");
        let fp2 = token_fingerprint("abc");
        assert_eq!(fp1, fp2);
        assert_eq!(fp1.len(), 12);
        assert_ne!(fp1, token_fingerprint("abd"));
    }
}
