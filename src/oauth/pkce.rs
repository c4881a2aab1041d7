//! PKCE (RFC 7636) challenge verification.

use base64::prelude::*;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::OAuthError;

/// Compute the S256 challenge for a code verifier
pub fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verify a presented code verifier against a stored challenge.
///
/// With method `S256` the challenge must equal the base64url (no padding)
/// SHA-256 of the verifier; any other method compares the verifier to the
/// challenge directly. Callers skip this entirely when no challenge was
/// stored with the authorization code.
pub fn verify_pkce(
    challenge: &str,
    method: Option<&str>,
    verifier: Option<&str>,
) -> Result<(), OAuthError> {
    let verifier = verifier.ok_or_else(|| {
        OAuthError::InvalidRequest("Missing code_verifier for PKCE".to_string())
    })?;

    let presented = match method {
        Some("S256") => s256_challenge(verifier),
        _ => verifier.to_string(),
    };

    if presented.as_bytes().ct_eq(challenge.as_bytes()).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(OAuthError::InvalidGrant("Invalid code_verifier".to_string()))
    }
}
