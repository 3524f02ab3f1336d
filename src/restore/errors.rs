//! Restore errors

use thiserror::Error;
use uuid::Uuid;

use crate::integrity::IntegrityError;
use crate::persistence::PersistenceError;
use crate::versioning::VersionError;

/// Result type for restore operations.
pub type RestoreResult<T> = Result<T, RestoreError>;

/// Restore errors.
#[derive(Debug, Clone, Error)]
pub enum RestoreError {
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Version not found: {0}")]
    VersionNotFound(Uuid),

    #[error("Version {version_number} not found for document {document_id}")]
    VersionNumberNotFound {
        document_id: Uuid,
        version_number: u64,
    },

    /// Cross-document guard: the target version exists but belongs to a
    /// different document.
    #[error("Version {version_id} does not belong to the specified document {document_id}")]
    CrossDocument {
        version_id: Uuid,
        document_id: Uuid,
    },

    /// The target (or freshly restored) version failed integrity
    /// validation; nothing was (or remains) materialized incorrectly.
    #[error("Integrity check failed for version {version_id}: {detail}")]
    IntegrityCheckFailed { version_id: Uuid, detail: String },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_document_message() {
        let err = RestoreError::CrossDocument {
            version_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
        };
        assert!(err.to_string().contains("does not belong to the specified document"));
    }
}
