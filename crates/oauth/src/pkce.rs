//! PKCE verifier/challenge and anti-forgery state generation.

use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::Rng,
    sha2::{Digest, Sha256},
};

use crate::types::PkceChallenge;

/// Unreserved URI characters permitted in a code verifier (RFC 7636 §4.1).
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
const VERIFIER_LEN: usize = 43;

impl PkceChallenge {
    /// Generate a random verifier and its S256 challenge: the base64url
    /// (no padding) encoding of the verifier's SHA-256 digest.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let verifier: String = (0..VERIFIER_LEN)
            .map(|_| {
                let idx = rng.random_range(0..VERIFIER_CHARSET.len());
                VERIFIER_CHARSET[idx] as char
            })
            .collect();

        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate a random state nonce tying the redirect back to this attempt.
pub fn generate_state() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_is_sha256_of_verifier() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.verifier.len(), 43);
        assert!(
            pkce.verifier
                .bytes()
                .all(|b| VERIFIER_CHARSET.contains(&b))
        );

        let decoded = URL_SAFE_NO_PAD.decode(&pkce.challenge).unwrap();
        assert_eq!(decoded, Sha256::digest(pkce.verifier.as_bytes()).as_slice());
    }

    #[test]
    fn test_pairs_are_unique() {
        let a = PkceChallenge::generate();
        let b = PkceChallenge::generate();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.challenge, b.challenge);
    }

    #[test]
    fn test_state_nonce() {
        let state = generate_state();
        // base64url of 32 bytes = 43 characters
        assert_eq!(state.len(), 43);
        assert_ne!(state, generate_state());
    }
}
