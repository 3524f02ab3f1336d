//! VersionStore - the single write path for document content
//!
//! Owns version creation, numbering, current-pointer maintenance, and
//! history queries. Invariants enforced here:
//! - Exactly one current version per live document
//! - Version numbers are gap-free and strictly increasing
//! - Identical content never produces a new version
//! - A version, once created, is immutable
//!
//! The workflow lock is consumed through the [`LockGate`] seam; the
//! persistence commit re-checks it inside the per-document critical
//! section, so the friendly pre-check here can never be the only line
//! of defense.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::access::{AccessControl, Permission};
use crate::audit::{AuditAction, AuditEntry, AuditRecorder};
use crate::blobstore::BlobStore;
use crate::config::VaultConfig;
use crate::crypto::{EncryptedPayload, EncryptionProvider};
use crate::observability::{log_event, Event};
use crate::persistence::{Persistence, PersistenceError, VersionCommit};

use super::checksum::compute_checksum;
use super::errors::{VersionError, VersionResult};
use super::types::{
    Document, EncryptionMetadata, HistoryQuery, Version, VersionContext, VersionHistory,
};

/// Snapshot of a document's lock status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    /// True while a blocking workflow exists.
    pub locked: bool,
    /// The blocking workflow, when locked.
    pub holder: Option<Uuid>,
}

impl LockState {
    /// An unlocked state.
    pub fn unlocked() -> Self {
        Self {
            locked: false,
            holder: None,
        }
    }

    /// A state locked by the given workflow.
    pub fn locked_by(workflow_id: Uuid) -> Self {
        Self {
            locked: true,
            holder: Some(workflow_id),
        }
    }
}

/// The document-lock predicate the version store consults before
/// writing. Implemented by the workflow engine.
pub trait LockGate: Send + Sync {
    /// The lock status for a document.
    fn lock_state(&self, document_id: Uuid) -> Result<LockState, PersistenceError>;
}

/// Gate for deployments without workflows: never locked.
#[derive(Debug, Default)]
pub struct NoLocks;

impl LockGate for NoLocks {
    fn lock_state(&self, _document_id: Uuid) -> Result<LockState, PersistenceError> {
        Ok(LockState::unlocked())
    }
}

/// The versioning service.
pub struct VersionStore {
    config: VaultConfig,
    store: Arc<dyn Persistence>,
    cipher: Arc<dyn EncryptionProvider>,
    blobs: Arc<dyn BlobStore>,
    access: Arc<dyn AccessControl>,
    audit: Arc<dyn AuditRecorder>,
    lock_gate: Arc<dyn LockGate>,
}

impl VersionStore {
    /// Construct a store over injected collaborators.
    pub fn new(
        config: VaultConfig,
        store: Arc<dyn Persistence>,
        cipher: Arc<dyn EncryptionProvider>,
        blobs: Arc<dyn BlobStore>,
        access: Arc<dyn AccessControl>,
        audit: Arc<dyn AuditRecorder>,
        lock_gate: Arc<dyn LockGate>,
    ) -> Self {
        Self {
            config,
            store,
            cipher,
            blobs,
            access,
            audit,
            lock_gate,
        }
    }

    /// Register a new document with its initial version (number 1,
    /// current) as one atomic unit. The upload pipeline authorizes
    /// registration; all subsequent operations are permission-checked.
    pub fn register_document(
        &self,
        case_id: Uuid,
        title: impl Into<String>,
        content: &[u8],
        ctx: &VersionContext,
    ) -> VersionResult<(Document, Version)> {
        self.check_size(content)?;

        let document_id = Uuid::new_v4();
        let version = self.build_version(document_id, 1, content, ctx)?;
        let document = Document {
            id: document_id,
            case_id,
            title: title.into(),
            current_version_id: version.id,
            is_deleted: false,
            created_at: version.created_at,
            created_by: ctx.user_id,
        };

        self.store.insert_document(document.clone(), version.clone())?;

        self.record_audit(
            AuditEntry::new(AuditAction::DocumentRegistered, ctx.user_id)
                .with_document(document_id)
                .with_details(serde_json::json!({
                    "case_id": document.case_id,
                    "title": document.title,
                    "version_id": version.id,
                })),
        );
        log_event(
            Event::DocumentRegistered,
            &[
                ("document_id", &document_id.to_string()),
                ("case_id", &case_id.to_string()),
            ],
        );

        Ok((document, version))
    }

    /// Create a new version of a document's content.
    ///
    /// Fails `AccessDenied` without Write permission or while a
    /// workflow locks the document, and `NoChangesDetected` when the
    /// content is byte-identical to the current version.
    pub fn create_version(
        &self,
        document_id: Uuid,
        content: &[u8],
        ctx: &VersionContext,
    ) -> VersionResult<Version> {
        let document = self.live_document(document_id)?;

        if !self
            .access
            .check_permission(ctx.user_id, document_id, Permission::Write)
        {
            return Err(VersionError::AccessDenied(format!(
                "user {} lacks WRITE permission on document {}",
                ctx.user_id, document_id
            )));
        }

        let lock = self.lock_gate.lock_state(document_id)?;
        if lock.locked {
            return Err(Self::locked_denial(document_id, lock.holder));
        }

        let current = self
            .store
            .current_version(document_id)?
            .ok_or(VersionError::VersionNotFound(document.current_version_id))?;

        let checksum = compute_checksum(content);
        if checksum == current.checksum {
            log_event(
                Event::VersionUnchanged,
                &[("document_id", &document_id.to_string())],
            );
            return Err(VersionError::NoChangesDetected);
        }

        self.check_size(content)?;

        let version = self.build_version(document_id, current.version_number + 1, content, ctx)?;

        let commit = VersionCommit {
            document_id,
            version: version.clone(),
            expected_current: current.id,
            require_unlocked: true,
        };
        self.store.commit_version(commit).map_err(|e| match e {
            PersistenceError::DocumentLocked { workflow_id, .. } => {
                Self::locked_denial(document_id, Some(workflow_id))
            }
            other => VersionError::Persistence(other),
        })?;

        self.record_audit(
            AuditEntry::new(AuditAction::VersionCreated, ctx.user_id)
                .with_document(document_id)
                .with_details(serde_json::json!({
                    "version_id": version.id,
                    "version_number": version.version_number,
                    "size": version.size,
                    "checksum": version.checksum,
                })),
        );
        log_event(
            Event::VersionCreated,
            &[
                ("document_id", &document_id.to_string()),
                ("version_number", &version.version_number.to_string()),
            ],
        );

        Ok(version)
    }

    /// One page of a document's version history, most recent first by
    /// default.
    pub fn get_version_history(
        &self,
        document_id: Uuid,
        query: &HistoryQuery,
    ) -> VersionResult<VersionHistory> {
        // History stays readable after soft deletion
        self.store
            .document(document_id)?
            .ok_or(VersionError::DocumentNotFound(document_id))?;

        if !self
            .access
            .check_permission(query.user_id, document_id, Permission::Read)
        {
            return Err(VersionError::AccessDenied(format!(
                "user {} lacks READ permission on document {}",
                query.user_id, document_id
            )));
        }

        let limit = self.config.history_page(query.limit);
        let (versions, has_more) =
            self.store
                .versions_for_document(document_id, query.sort_order, limit, query.offset)?;

        Ok(VersionHistory { versions, has_more })
    }

    /// Fetch a version's metadata.
    pub fn get_version(&self, version_id: Uuid, user_id: Uuid) -> VersionResult<Version> {
        let version = self
            .store
            .version(version_id)?
            .ok_or(VersionError::VersionNotFound(version_id))?;

        if !self
            .access
            .check_permission(user_id, version.document_id, Permission::Read)
        {
            return Err(VersionError::AccessDenied(format!(
                "user {} lacks READ permission on document {}",
                user_id, version.document_id
            )));
        }

        Ok(version)
    }

    /// Fetch and decrypt a version's content.
    ///
    /// The returned bytes are verified against the stored checksum and
    /// size; any disagreement fails `IntegrityFailure` rather than
    /// returning corrupted content.
    pub fn get_version_content(&self, version_id: Uuid, user_id: Uuid) -> VersionResult<Vec<u8>> {
        let version = self.get_version(version_id, user_id)?;

        let ciphertext = self.blobs.get(&version.storage_path)?;
        let plaintext = self.cipher.decrypt(&EncryptedPayload {
            ciphertext,
            key_id: version.encryption.key_id.clone(),
            iv: version.encryption.iv.clone(),
            auth_tag: version.encryption.auth_tag.clone(),
        })?;

        if plaintext.len() as u64 != version.size {
            return Err(VersionError::IntegrityFailure {
                version_id,
                detail: format!(
                    "decrypted size {} does not match recorded size {}",
                    plaintext.len(),
                    version.size
                ),
            });
        }
        if compute_checksum(&plaintext) != version.checksum {
            log_event(
                Event::IntegrityViolation,
                &[("version_id", &version_id.to_string())],
            );
            return Err(VersionError::IntegrityFailure {
                version_id,
                detail: "decrypted content does not match recorded checksum".to_string(),
            });
        }

        Ok(plaintext)
    }

    /// Soft-delete a document. Versions are retained; the document can
    /// no longer receive new versions.
    pub fn delete_document(&self, document_id: Uuid, user_id: Uuid) -> VersionResult<()> {
        self.live_document(document_id)?;

        if !self
            .access
            .check_permission(user_id, document_id, Permission::Delete)
        {
            return Err(VersionError::AccessDenied(format!(
                "user {} lacks DELETE permission on document {}",
                user_id, document_id
            )));
        }

        let lock = self.lock_gate.lock_state(document_id)?;
        if lock.locked {
            return Err(Self::locked_denial(document_id, lock.holder));
        }

        self.store.mark_document_deleted(document_id)?;

        self.record_audit(
            AuditEntry::new(AuditAction::DocumentDeleted, user_id).with_document(document_id),
        );
        log_event(
            Event::DocumentDeleted,
            &[("document_id", &document_id.to_string())],
        );

        Ok(())
    }

    /// Fetch a document row, deleted or not.
    pub fn get_document(&self, document_id: Uuid, user_id: Uuid) -> VersionResult<Document> {
        let document = self
            .store
            .document(document_id)?
            .ok_or(VersionError::DocumentNotFound(document_id))?;

        if !self
            .access
            .check_permission(user_id, document_id, Permission::Read)
        {
            return Err(VersionError::AccessDenied(format!(
                "user {} lacks READ permission on document {}",
                user_id, document_id
            )));
        }

        Ok(document)
    }

    fn live_document(&self, document_id: Uuid) -> VersionResult<Document> {
        let document = self
            .store
            .document(document_id)?
            .ok_or(VersionError::DocumentNotFound(document_id))?;
        if document.is_deleted {
            return Err(VersionError::DocumentNotFound(document_id));
        }
        Ok(document)
    }

    fn check_size(&self, content: &[u8]) -> VersionResult<()> {
        let size = content.len() as u64;
        if size > self.config.max_content_bytes {
            return Err(VersionError::ContentTooLarge {
                size,
                max: self.config.max_content_bytes,
            });
        }
        Ok(())
    }

    /// Encrypt content, store the blob, and assemble the version row.
    fn build_version(
        &self,
        document_id: Uuid,
        version_number: u64,
        content: &[u8],
        ctx: &VersionContext,
    ) -> VersionResult<Version> {
        let checksum = compute_checksum(content);
        let encrypted = self.cipher.encrypt(content)?;
        let storage_path = self.blobs.put(&encrypted.ciphertext)?;

        Ok(Version {
            id: Uuid::new_v4(),
            document_id,
            version_number,
            size: content.len() as u64,
            checksum,
            storage_path,
            encryption: EncryptionMetadata {
                key_id: encrypted.key_id,
                iv: encrypted.iv,
                auth_tag: encrypted.auth_tag,
            },
            created_at: Utc::now(),
            created_by: ctx.user_id,
            change_description: ctx.change_description.clone(),
            is_current: true,
        })
    }

    fn locked_denial(document_id: Uuid, holder: Option<Uuid>) -> VersionError {
        match holder {
            Some(workflow_id) => VersionError::AccessDenied(format!(
                "document {} is locked by workflow {}",
                document_id, workflow_id
            )),
            None => VersionError::AccessDenied(format!("document {} is locked", document_id)),
        }
    }

    /// Audit failures never fail the primary operation.
    fn record_audit(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.record(&entry) {
            log_event(
                Event::AuditAppendFailed,
                &[
                    ("action", entry.action.as_str()),
                    ("error", &e.to_string()),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AllowAllAccess;
    use crate::audit::StoreAuditRecorder;
    use crate::blobstore::InMemoryBlobStore;
    use crate::crypto::DevCipher;
    use crate::persistence::InMemoryPersistence;
    use crate::versioning::SortOrder;

    fn test_store() -> (VersionStore, Arc<InMemoryPersistence>) {
        let store: Arc<InMemoryPersistence> = Arc::new(InMemoryPersistence::new());
        let versions = VersionStore::new(
            VaultConfig::default(),
            store.clone(),
            Arc::new(DevCipher::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(AllowAllAccess::new()),
            Arc::new(StoreAuditRecorder::new(store.clone())),
            Arc::new(NoLocks),
        );
        (versions, store)
    }

    fn register(versions: &VersionStore) -> (Document, Version, VersionContext) {
        let ctx = VersionContext::new(Uuid::new_v4());
        let (document, v1) = versions
            .register_document(Uuid::new_v4(), "Retainer agreement", b"draft one", &ctx)
            .unwrap();
        (document, v1, ctx)
    }

    #[test]
    fn test_register_creates_initial_version() {
        let (versions, _) = test_store();
        let (document, v1, _) = register(&versions);

        assert_eq!(v1.version_number, 1);
        assert!(v1.is_current);
        assert_eq!(document.current_version_id, v1.id);
    }

    #[test]
    fn test_create_version_advances_pointer() {
        let (versions, store) = test_store();
        let (document, v1, ctx) = register(&versions);

        let v2 = versions
            .create_version(document.id, b"draft two", &ctx)
            .unwrap();

        assert_eq!(v2.version_number, 2);
        assert!(v2.is_current);
        assert!(!store.version(v1.id).unwrap().unwrap().is_current);
        assert_eq!(
            store.document(document.id).unwrap().unwrap().current_version_id,
            v2.id
        );
    }

    #[test]
    fn test_no_changes_detected() {
        let (versions, store) = test_store();
        let (document, _, ctx) = register(&versions);

        let result = versions.create_version(document.id, b"draft one", &ctx);
        assert!(matches!(result, Err(VersionError::NoChangesDetected)));

        // No extra row was written
        let (page, _) = store
            .versions_for_document(document.id, SortOrder::Descending, 10, 0)
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_content_round_trip() {
        let (versions, _) = test_store();
        let (document, _, ctx) = register(&versions);

        let content = b"second draft with privileged annotations";
        let v2 = versions.create_version(document.id, content, &ctx).unwrap();

        let retrieved = versions.get_version_content(v2.id, ctx.user_id).unwrap();
        assert_eq!(retrieved, content);
    }

    #[test]
    fn test_write_denied_without_permission() {
        let store: Arc<InMemoryPersistence> = Arc::new(InMemoryPersistence::new());
        let access = Arc::new(crate::access::InMemoryAccessControl::new());
        let versions = VersionStore::new(
            VaultConfig::default(),
            store.clone(),
            Arc::new(DevCipher::new()),
            Arc::new(InMemoryBlobStore::new()),
            access.clone(),
            Arc::new(StoreAuditRecorder::new(store)),
            Arc::new(NoLocks),
        );

        let ctx = VersionContext::new(Uuid::new_v4());
        let (document, _) = versions
            .register_document(Uuid::new_v4(), "Motion", b"v1", &ctx)
            .unwrap();

        let result = versions.create_version(document.id, b"v2", &ctx);
        assert!(matches!(result, Err(VersionError::AccessDenied(_))));

        access.grant(ctx.user_id, document.id, Permission::Write);
        assert!(versions.create_version(document.id, b"v2", &ctx).is_ok());
    }

    #[test]
    fn test_locked_document_rejects_writes() {
        struct AlwaysLocked(Uuid);
        impl LockGate for AlwaysLocked {
            fn lock_state(&self, _d: Uuid) -> Result<LockState, PersistenceError> {
                Ok(LockState::locked_by(self.0))
            }
        }

        let store: Arc<InMemoryPersistence> = Arc::new(InMemoryPersistence::new());
        let workflow_id = Uuid::new_v4();
        let versions = VersionStore::new(
            VaultConfig::default(),
            store.clone(),
            Arc::new(DevCipher::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(AllowAllAccess::new()),
            Arc::new(StoreAuditRecorder::new(store)),
            Arc::new(AlwaysLocked(workflow_id)),
        );

        let ctx = VersionContext::new(Uuid::new_v4());
        let (document, _) = versions
            .register_document(Uuid::new_v4(), "Brief", b"v1", &ctx)
            .unwrap();

        let err = versions
            .create_version(document.id, b"v2", &ctx)
            .unwrap_err();
        match err {
            VersionError::AccessDenied(reason) => {
                assert!(reason.contains("locked"));
                assert!(reason.contains(&workflow_id.to_string()));
            }
            other => panic!("expected AccessDenied, got {other:?}"),
        }
    }

    #[test]
    fn test_history_default_order_is_descending() {
        let (versions, _) = test_store();
        let (document, _, ctx) = register(&versions);
        versions.create_version(document.id, b"two", &ctx).unwrap();
        versions.create_version(document.id, b"three", &ctx).unwrap();

        let history = versions
            .get_version_history(document.id, &HistoryQuery::new(ctx.user_id))
            .unwrap();

        let numbers: Vec<u64> = history.versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert!(!history.has_more);
    }

    #[test]
    fn test_history_pagination() {
        let (versions, _) = test_store();
        let (document, _, ctx) = register(&versions);
        for i in 2..=5 {
            versions
                .create_version(document.id, format!("draft {i}").as_bytes(), &ctx)
                .unwrap();
        }

        let query = HistoryQuery {
            user_id: ctx.user_id,
            sort_order: SortOrder::Descending,
            limit: Some(2),
            offset: 0,
        };
        let page = versions.get_version_history(document.id, &query).unwrap();
        assert_eq!(page.versions.len(), 2);
        assert_eq!(page.versions[0].version_number, 5);
        assert!(page.has_more);
    }

    #[test]
    fn test_oversized_content_rejected() {
        let store: Arc<InMemoryPersistence> = Arc::new(InMemoryPersistence::new());
        let versions = VersionStore::new(
            VaultConfig {
                max_content_bytes: 8,
                ..VaultConfig::default()
            },
            store.clone(),
            Arc::new(DevCipher::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(AllowAllAccess::new()),
            Arc::new(StoreAuditRecorder::new(store)),
            Arc::new(NoLocks),
        );

        let ctx = VersionContext::new(Uuid::new_v4());
        let result = versions.register_document(Uuid::new_v4(), "Large", b"way past the cap", &ctx);
        assert!(matches!(
            result,
            Err(VersionError::ContentTooLarge { .. })
        ));
    }

    #[test]
    fn test_deleted_document_rejects_new_versions() {
        let (versions, _) = test_store();
        let (document, _, ctx) = register(&versions);

        versions.delete_document(document.id, ctx.user_id).unwrap();

        let result = versions.create_version(document.id, b"after delete", &ctx);
        assert!(matches!(result, Err(VersionError::DocumentNotFound(_))));

        // History remains readable for audit purposes
        assert!(versions
            .get_version_history(document.id, &HistoryQuery::new(ctx.user_id))
            .is_ok());
    }

    #[test]
    fn test_audit_entries_written_for_mutations() {
        let store: Arc<InMemoryPersistence> = Arc::new(InMemoryPersistence::new());
        let audit = Arc::new(crate::audit::MemoryAuditRecorder::new());
        let versions = VersionStore::new(
            VaultConfig::default(),
            store,
            Arc::new(DevCipher::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(AllowAllAccess::new()),
            audit.clone(),
            Arc::new(NoLocks),
        );

        let ctx = VersionContext::new(Uuid::new_v4());
        let (document, _) = versions
            .register_document(Uuid::new_v4(), "Deed", b"one", &ctx)
            .unwrap();
        versions.create_version(document.id, b"two", &ctx).unwrap();

        let actions: Vec<_> = audit.entries().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::DocumentRegistered, AuditAction::VersionCreated]
        );
        assert!(audit.entries().iter().all(|e| e.document_id == Some(document.id)));
    }
}
