//! Security utilities for access-token hashing and signup link tokens.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generates a fresh raw access token. Only the hash is ever stored.
pub fn generate_access_token() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    let raw: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("tk_{}", raw)
}

/// Hashes an access token using SHA-256.
pub fn hash_access_token(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

/// Verifies an access token against a stored hash using constant-time
/// comparison.
pub fn verify_access_token(input: &str, stored_hash: &str) -> bool {
    let input_hash = hash_access_token(input);
    input_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Signs an email into a link token using HMAC-SHA256.
///
/// The token is handed out when a signup collides with an existing email,
/// so the client can link the new identity to the old member.
pub fn sign_link_token(email: &str, secret: &str) -> String {
    use hmac::{Hmac, Mac};

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(email.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a link token using constant-time comparison.
pub fn verify_link_token(email: &str, token: &str, secret: &str) -> bool {
    let expected = sign_link_token(email, secret);
    expected.as_bytes().ct_eq(token.as_bytes()).into()
}
