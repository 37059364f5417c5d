//! SHA-256 hashing of bearer tokens.
//!
//! Sessions store only the digest; a presented token is hashed and looked up.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of a bearer token.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}
