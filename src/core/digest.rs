//! Digests for Credentials
//!
//! Domain-separated SHA-256 used by the access guard:
//! - comparing submitted credentials against the configured pair
//! - short token fingerprints for log lines (never log the token itself)

use sha2::{Digest, Sha256};

/// Digest output type (256 bits / 32 bytes)
pub type Digest256 = [u8; 32];

/// Domain for identity digests.
pub const IDENTITY_DOMAIN: &[u8] = b"SLOTBOARD_IDENTITY_V1";

/// Domain for secret digests.
pub const SECRET_DOMAIN: &[u8] = b"SLOTBOARD_SECRET_V1";

/// Domain for token fingerprints.
pub const TOKEN_DOMAIN: &[u8] = b"SLOTBOARD_TOKEN_V1";

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Digest256 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Compare two digests without short-circuiting on the first differing byte.
pub fn digests_match(a: &Digest256, b: &Digest256) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Short hex fingerprint of a token, safe to log.
pub fn token_fingerprint(token: &str) -> String {
    let digest = hash_with_domain(TOKEN_DOMAIN, token.as_bytes());
    hex::encode(&digest[..4])
}
