//! Cryptographic utilities for webhook signature validation.
//!
//! The gateway signs every delivery with HMAC-SHA256 over the exact request
//! body and sends the lowercase hex digest in a header. Verification always
//! runs over the bytes as received; re-serializing a parsed body would change
//! whitespace or key order and break the digest.

use std::fmt;

use hmac::{Hmac, Mac};
use pinhook_core::SecretString;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex encoded SHA-256 digest.
const HEX_DIGEST_LEN: usize = 64;

/// Outcome of checking a webhook signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The header carries the exact digest of the body.
    Authenticated,
    /// Anything else.
    Rejected(SignatureError),
}

impl SignatureCheck {
    /// Returns whether the body was authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Signature validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Missing or empty signature header.
    MissingSignature,
    /// Header is not a hex encoded SHA-256 digest.
    InvalidFormat(String),
    /// Digest does not match the body.
    VerificationFailed,
    /// No usable secret configured.
    InvalidSecret,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSignature => write!(f, "signature header missing"),
            Self::InvalidFormat(format) => write!(f, "invalid signature format: {format}"),
            Self::VerificationFailed => write!(f, "signature verification failed"),
            Self::InvalidSecret => write!(f, "invalid secret key"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// Verifies `provided` against HMAC-SHA256(`secret`, `payload`).
///
/// Fails closed: a missing header, bad hex, wrong length, empty secret or any
/// mismatch yields `Rejected`. The digest comparison runs in constant time.
///
/// # Example
///
/// ```
/// use pinhook_api::crypto::{sign_payload, verify_signature, SignatureCheck};
/// use pinhook_core::SecretString;
///
/// let secret = SecretString::new("s3cr3t");
/// let body = br#"{"event":"payment.captured"}"#;
/// let signature = sign_payload(body, &secret).unwrap();
///
/// assert_eq!(verify_signature(body, Some(&signature), &secret), SignatureCheck::Authenticated);
/// assert!(!verify_signature(body, Some("deadbeef"), &secret).is_authenticated());
/// ```
pub fn verify_signature(
    payload: &[u8],
    provided: Option<&str>,
    secret: &SecretString,
) -> SignatureCheck {
    match check(payload, provided, secret) {
        Ok(()) => SignatureCheck::Authenticated,
        Err(err) => SignatureCheck::Rejected(err),
    }
}

fn check(payload: &[u8], provided: Option<&str>, secret: &SecretString) -> Result<(), SignatureError> {
    let provided = provided.filter(|s| !s.is_empty()).ok_or(SignatureError::MissingSignature)?;
    let expected = decode_digest(provided)?;

    let mut mac = new_mac(secret)?;
    mac.update(payload);
    mac.verify_slice(&expected).map_err(|_| SignatureError::VerificationFailed)
}

/// Computes the lowercase hex HMAC-SHA256 of `payload`.
///
/// Used by operators and tests to produce a signature the verifier accepts.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret is empty.
pub fn sign_payload(payload: &[u8], secret: &SecretString) -> Result<String, SignatureError> {
    let mut mac = new_mac(secret)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn new_mac(secret: &SecretString) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::InvalidSecret);
    }
    HmacSha256::new_from_slice(secret.expose().as_bytes()).map_err(|_| SignatureError::InvalidSecret)
}

/// Decodes a raw hex digest.
fn decode_digest(signature: &str) -> Result<Vec<u8>, SignatureError> {
    if signature.len() != HEX_DIGEST_LEN {
        return Err(SignatureError::InvalidFormat(format!(
            "expected {HEX_DIGEST_LEN} hex characters, got {}",
            signature.len()
        )));
    }

    hex::decode(signature)
        .map_err(|e| SignatureError::InvalidFormat(format!("signature is not valid hex: {e}")))
}
