//! Versioning errors

use thiserror::Error;
use uuid::Uuid;

use crate::blobstore::BlobError;
use crate::crypto::CryptoError;
use crate::persistence::PersistenceError;

/// Result type for versioning operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Versioning errors.
#[derive(Debug, Clone, Error)]
pub enum VersionError {
    /// Missing permission, or the document is locked by a workflow.
    /// The lock case carries a reason mentioning "locked".
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Version not found: {0}")]
    VersionNotFound(Uuid),

    /// Idempotence guard, not a conventional failure: the submitted
    /// content is byte-identical to the current version, so no row was
    /// written.
    #[error("No changes detected: content matches the current version")]
    NoChangesDetected,

    #[error("Content too large: {size} bytes (max: {max})")]
    ContentTooLarge { size: u64, max: u64 },

    /// Stored state disagrees with itself (checksum, size, or storage
    /// handle). Reads never return silently corrupted content.
    #[error("Integrity failure on version {version_id}: {detail}")]
    IntegrityFailure { version_id: Uuid, detail: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}
