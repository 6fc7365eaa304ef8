//! Small shared helpers.

use sha2::{Digest, Sha256};

/// Stable 64-bit hash of a string, independent of platform and process.
/// Used to seed the deterministic demo collaborators.
pub fn stable_hash(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Short hex digest for synthetic ids.
pub fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}
