//! PKCE (RFC 7636) verifier/challenge pairs for the authorization code flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 32;

/// A verifier/challenge pair. The verifier stays local until token exchange;
/// only the challenge travels in the authorization URL.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    /// Always S256.
    pub method: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let random: Vec<u8> = (0..VERIFIER_BYTES).map(|_| rng.gen()).collect();
        let verifier = URL_SAFE_NO_PAD.encode(&random);

        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(digest);

        Self {
            verifier,
            challenge,
            method: "S256".to_string(),
        }
    }
}
