//! Opaque token generation (spec §6): URL-safe, ≥128 bits of entropy, drawn
//! from a CSPRNG. No structured information is encoded in the string —
//! every attribute lives in the store.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

/// 16 bytes == 128 bits, the spec's stated minimum. Base64 (no padding)
/// renders that as 22 characters, meeting the "≥22 characters" wire rule.
const TOKEN_ENTROPY_BYTES: usize = 16;

/// Generate a fresh opaque token string. Stateless; safe to call
/// concurrently from any number of in-flight `Exchange` calls.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_long_enough() {
        let token = generate_token();
        assert!(token.len() >= 22);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_are_not_repeated_across_many_draws() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_token()), "generated a duplicate token");
        }
    }
}
