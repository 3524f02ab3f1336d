//! SHA-256 content checksums
//!
//! Checksums serve two purposes in the versioning core:
//! - Detect no-op writes: identical content never produces a new version
//! - Verify the encrypt/store/decrypt round-trip returned the original
//!   bytes
//!
//! Digests are lowercase hex, computed over the plaintext before
//! encryption.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 hex digest of the provided content.
///
/// Deterministic: the same input always produces the same output.
pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Verifies that content matches an expected digest.
pub fn verify_checksum(content: &[u8], expected: &str) -> bool {
    compute_checksum(content) == expected
}
