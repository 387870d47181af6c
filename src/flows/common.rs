//! Shared helpers for flow implementations (nonce generation, PKCE derivation).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Length of the CSRF `state` nonce.
pub(crate) const STATE_LEN: usize = 32;
/// Length of the PKCE code verifier (RFC 7636 allows 43..=128).
pub(crate) const PKCE_VERIFIER_LEN: usize = 64;

/// Draws `len` alphanumeric characters from the thread-local CSPRNG.
pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

/// Derives the S256 code challenge for `verifier`.
pub(crate) fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}
