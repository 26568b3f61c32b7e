//! PKCE (Proof Key for Code Exchange) helpers for the OAuth redirect flow
//!
//! Implements RFC 7636. The verifier stays with the client until the
//! provider redirects back with an authorization code; only the challenge
//! travels in the authorization URL.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes behind a verifier (encodes to 43 characters)
const VERIFIER_BYTES: usize = 32;

/// Generate a URL-safe random code verifier.
///
/// Per RFC 7636, verifiers must be 43-128 characters long.
pub fn generate_code_verifier() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..VERIFIER_BYTES).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// BASE64URL(SHA256(ASCII(code_verifier)))
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Verifier/challenge pair for a single authorization attempt.
#[derive(Clone)]
pub struct PkceChallenge {
    /// Kept secret until the code exchange
    pub code_verifier: String,

    /// Sent in the authorization request
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh pair.
    ///
    /// # Examples
    /// ```
    /// use accountsync_common::auth::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert!(challenge.code_verifier.len() >= 43);
    /// assert!(challenge.code_verifier.len() <= 128);
    /// ```
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);

        Self { code_verifier, code_challenge }
    }

    /// Challenge method as spelled by GoTrue-compatible providers
    pub fn challenge_method(&self) -> &'static str {
        "s256"
    }

    /// `true` if `verifier` hashes to this challenge.
    pub fn matches(&self, verifier: &str) -> bool {
        constant_time_eq(generate_code_challenge(verifier).as_bytes(), self.code_challenge.as_bytes())
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
