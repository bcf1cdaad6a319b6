//! PKCE (Proof Key for Code Exchange)
//!
//! Implements RFC 7636 for secure authorization code flow.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// PKCE code verifier and challenge pair
#[derive(Clone)]
pub struct PkceChallenge {
    /// The code verifier (kept secret, sent in token exchange)
    pub verifier: Zeroizing<String>,
    /// The code challenge (sent in authorization request)
    pub challenge: String,
    /// Challenge method (always S256)
    pub method: &'static str,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge from 32 random bytes
    pub fn generate() -> Self {
        let mut random_bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut *random_bytes);

        let verifier = Zeroizing::new(URL_SAFE_NO_PAD.encode(&*random_bytes));
        let challenge = challenge_for(&verifier);

        Self {
            verifier,
            challenge,
            method: "S256",
        }
    }

    /// Verify that a verifier matches a challenge
    pub fn verify(verifier: &str, challenge: &str) -> bool {
        challenge_for(verifier) == challenge
    }
}

impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .field("method", &self.method)
            .finish()
    }
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Random `state` value for CSRF protection (16 bytes, base64url)
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
