/// Callback signature derivation and verification
///
/// The platform signs every callback with SHA-1 over the token, timestamp,
/// nonce and body (echo string or encrypted message), sorted byte-wise and
/// concatenated with no separator.
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Length of a hex-encoded SHA-1 digest
pub const SIGNATURE_LEN: usize = 40;

/// Derive the callback signature
///
/// # Returns
/// Lowercase hex SHA-1 digest (40 characters)
pub fn sign(token: &str, timestamp: &str, nonce: &str, body: &str) -> String {
    let mut parts = [token, timestamp, nonce, body];
    // str ordering is byte-wise, which is what the platform uses
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Verify a received signature in constant time
///
/// Never fails: any missing field or mismatch yields `false`, and the caller
/// must reject the request without attempting decryption.
pub fn verify(token: &str, received: &str, timestamp: &str, nonce: &str, body: &str) -> bool {
    if token.is_empty() || timestamp.is_empty() || nonce.is_empty() || body.is_empty() {
        return false;
    }

    let received = received.as_bytes();
    if received.len() != SIGNATURE_LEN {
        return false;
    }

    let expected = sign(token, timestamp, nonce, body);
    received.ct_eq(expected.as_bytes()).into()
}
