//! Version integrity validation
//!
//! Answers one question: does a version's stored state agree with
//! itself? Five checks, reported individually so operators can tell a
//! missing blob from a checksum mismatch:
//! - metadata fields populated
//! - storage handle resolves
//! - payload readable
//! - decryption succeeds (auth tag verifies)
//! - decrypted content matches recorded checksum and size
//!
//! Used before and after restoration to detect silent corruption.
//! Corruption is reported in the result flags, never silently ignored
//! and never conflated with operational errors (missing version, denied
//! access), which fail the call itself.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::access::{AccessControl, Permission};
use crate::blobstore::BlobStore;
use crate::crypto::{EncryptedPayload, EncryptionProvider};
use crate::observability::{log_event, Event};
use crate::persistence::{Persistence, PersistenceError};
use crate::versioning::{compute_checksum, Version};

/// Result type for integrity operations.
pub type IntegrityResult<T> = Result<T, IntegrityError>;

/// Errors that prevent a check from running at all.
#[derive(Debug, Clone, Error)]
pub enum IntegrityError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Version not found: {0}")]
    VersionNotFound(Uuid),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Per-check outcome of an integrity validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Decrypted content matches the recorded checksum and size.
    pub checksum_valid: bool,
    /// The stored payload could be read back.
    pub content_accessible: bool,
    /// All required metadata fields are populated.
    pub metadata_complete: bool,
    /// The storage handle resolves to a stored payload.
    pub storage_path_valid: bool,
    /// Decryption succeeded with the recorded metadata.
    pub encryption_valid: bool,
}

impl IntegrityReport {
    /// True when every check passed.
    pub fn is_clean(&self) -> bool {
        self.checksum_valid
            && self.content_accessible
            && self.metadata_complete
            && self.storage_path_valid
            && self.encryption_valid
    }
}

/// Validates stored versions against their own metadata.
pub struct IntegrityValidator {
    store: Arc<dyn Persistence>,
    cipher: Arc<dyn EncryptionProvider>,
    blobs: Arc<dyn BlobStore>,
    access: Arc<dyn AccessControl>,
}

impl IntegrityValidator {
    /// Construct a validator over injected collaborators.
    pub fn new(
        store: Arc<dyn Persistence>,
        cipher: Arc<dyn EncryptionProvider>,
        blobs: Arc<dyn BlobStore>,
        access: Arc<dyn AccessControl>,
    ) -> Self {
        Self {
            store,
            cipher,
            blobs,
            access,
        }
    }

    /// Run all five checks against a version.
    pub fn validate_version(
        &self,
        version_id: Uuid,
        user_id: Uuid,
    ) -> IntegrityResult<IntegrityReport> {
        let version = self
            .store
            .version(version_id)?
            .ok_or(IntegrityError::VersionNotFound(version_id))?;

        if !self
            .access
            .check_permission(user_id, version.document_id, Permission::Read)
        {
            return Err(IntegrityError::AccessDenied(format!(
                "user {} lacks READ permission on document {}",
                user_id, version.document_id
            )));
        }

        let report = self.inspect(&version);
        if !report.is_clean() {
            log_event(
                Event::IntegrityViolation,
                &[
                    ("version_id", &version_id.to_string()),
                    ("document_id", &version.document_id.to_string()),
                ],
            );
        }

        Ok(report)
    }

    fn inspect(&self, version: &Version) -> IntegrityReport {
        let metadata_complete = !version.checksum.is_empty()
            && !version.storage_path.is_empty()
            && version.encryption.is_complete();

        let storage_path_valid = self.blobs.contains(&version.storage_path);

        let ciphertext = match self.blobs.get(&version.storage_path) {
            Ok(bytes) => bytes,
            Err(_) => {
                return IntegrityReport {
                    checksum_valid: false,
                    content_accessible: false,
                    metadata_complete,
                    storage_path_valid,
                    encryption_valid: false,
                };
            }
        };

        let plaintext = match self.cipher.decrypt(&EncryptedPayload {
            ciphertext,
            key_id: version.encryption.key_id.clone(),
            iv: version.encryption.iv.clone(),
            auth_tag: version.encryption.auth_tag.clone(),
        }) {
            Ok(bytes) => bytes,
            Err(_) => {
                return IntegrityReport {
                    checksum_valid: false,
                    content_accessible: true,
                    metadata_complete,
                    storage_path_valid,
                    encryption_valid: false,
                };
            }
        };

        let checksum_valid = plaintext.len() as u64 == version.size
            && compute_checksum(&plaintext) == version.checksum;

        IntegrityReport {
            checksum_valid,
            content_accessible: true,
            metadata_complete,
            storage_path_valid,
            encryption_valid: true,
        }
    }
}
