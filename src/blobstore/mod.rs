//! Encrypted blob storage
//!
//! Versions reference their encrypted payloads through opaque handles.
//! The blob store:
//! - Never interprets payloads (they arrive already encrypted)
//! - Never overwrites: a handle is written once and is immutable
//! - Verifies framing checksums on every read ([`LocalBlobStore`])

mod local;
mod memory;

pub use local::LocalBlobStore;
pub use memory::InMemoryBlobStore;

use thiserror::Error;

/// Result type for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Blob storage errors.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Blob I/O error: {0}")]
    Io(String),
}

/// Handle-addressed storage for encrypted payloads.
pub trait BlobStore: Send + Sync {
    /// Store a payload and return its opaque handle.
    fn put(&self, data: &[u8]) -> BlobResult<String>;

    /// Read a payload back, byte-for-byte.
    fn get(&self, handle: &str) -> BlobResult<Vec<u8>>;

    /// True if the handle resolves to a stored payload.
    fn contains(&self, handle: &str) -> bool;
}
