//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements S256 code challenge verification per RFC 7636. The canonical
//! challenge form is unpadded base64url; padded challenges are normalised on
//! the way in so both client encodings verify.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compute the S256 challenge for a verifier: `BASE64URL(SHA256(code_verifier))`.
#[must_use]
pub fn s256_challenge(code_verifier: &str) -> String {
    let hash = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Strip trailing `=` padding so the stored challenge is in canonical form.
#[must_use]
pub fn normalize_challenge(code_challenge: &str) -> String {
    code_challenge.trim_end_matches('=').to_owned()
}

/// Verify a PKCE S256 code challenge.
///
/// Computes `BASE64URL(SHA256(code_verifier))` and compares to the stored
/// challenge in constant time.
#[must_use]
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    let computed = s256_challenge(code_verifier);
    let expected = normalize_challenge(code_challenge);
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}
