//! Restoration and rollback
//!
//! Restoration never rewinds history:
//! 1. Resolve the target version (by id, or by number for rollback)
//! 2. Reject cross-document targets
//! 3. Optionally validate the target's integrity
//! 4. Materialize its content as a NEW version through the version
//!    store's ordinary creation path
//! 5. Optionally validate the new version's integrity
//!
//! Either the new version exists and is current, or the call failed and
//! history is exactly as it was. Prior versions are never mutated or
//! removed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEntry, AuditRecorder};
use crate::integrity::IntegrityValidator;
use crate::observability::{log_event, Event};
use crate::persistence::Persistence;
use crate::versioning::{Version, VersionContext, VersionStore};

use super::errors::{RestoreError, RestoreResult};

/// Options for restore/rollback operations.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Validate the target before and the new version after
    /// materialization. On by default.
    pub verify_integrity: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            verify_integrity: true,
        }
    }
}

/// Outcome of a restore: the historical source and the fresh current.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// The historical version that supplied the content. Unchanged.
    pub restored_version: Version,
    /// The freshly created current version.
    pub new_current_version: Version,
}

/// Summary attached to rollback outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackSummary {
    /// Versions superseded by stepping back from the previous current
    /// to the target. At least 1.
    pub versions_affected: u64,
    /// Always true: rollback never removes history.
    pub preserved_versions: bool,
    /// When the rollback executed.
    pub executed_at: DateTime<Utc>,
}

/// Outcome of a rollback.
#[derive(Debug, Clone)]
pub struct RollbackOutcome {
    /// The historical version rolled back to. Unchanged.
    pub rollback_version: Version,
    /// The freshly created current version.
    pub new_current_version: Version,
    /// What the rollback did.
    pub rollback_summary: RollbackSummary,
}

/// Restoration service built atop the version store's creation path.
pub struct RestoreEngine {
    store: Arc<dyn Persistence>,
    versions: Arc<VersionStore>,
    integrity: Arc<IntegrityValidator>,
    audit: Arc<dyn AuditRecorder>,
}

impl RestoreEngine {
    /// Construct an engine over injected collaborators.
    pub fn new(
        store: Arc<dyn Persistence>,
        versions: Arc<VersionStore>,
        integrity: Arc<IntegrityValidator>,
        audit: Arc<dyn AuditRecorder>,
    ) -> Self {
        Self {
            store,
            versions,
            integrity,
            audit,
        }
    }

    /// Materialize a historical version's content as the new current
    /// version.
    pub fn restore_version(
        &self,
        document_id: Uuid,
        target_version_id: Uuid,
        user_id: Uuid,
        description: Option<String>,
        options: &RestoreOptions,
    ) -> RestoreResult<RestoreOutcome> {
        log_event(
            Event::RestoreStart,
            &[
                ("document_id", &document_id.to_string()),
                ("target_version_id", &target_version_id.to_string()),
            ],
        );

        let target = self
            .store
            .version(target_version_id)?
            .ok_or(RestoreError::VersionNotFound(target_version_id))?;

        if target.document_id != document_id {
            return Err(RestoreError::CrossDocument {
                version_id: target_version_id,
                document_id,
            });
        }

        let outcome = self.materialize(document_id, target, user_id, description, options);

        match &outcome {
            Ok(restored) => {
                self.record_audit(
                    AuditEntry::new(AuditAction::VersionRestored, user_id)
                        .with_document(document_id)
                        .with_details(serde_json::json!({
                            "restored_from_version": restored.restored_version.version_number,
                            "restored_from_id": restored.restored_version.id,
                            "new_version_number": restored.new_current_version.version_number,
                            "new_version_id": restored.new_current_version.id,
                        })),
                );
                log_event(
                    Event::RestoreComplete,
                    &[
                        ("document_id", &document_id.to_string()),
                        (
                            "new_version_number",
                            &restored.new_current_version.version_number.to_string(),
                        ),
                    ],
                );
            }
            Err(e) => {
                log_event(
                    Event::RestoreFailed,
                    &[
                        ("document_id", &document_id.to_string()),
                        ("error", &e.to_string()),
                    ],
                );
            }
        }

        outcome
    }

    /// Restore identified by version number rather than version id.
    pub fn rollback_to_version(
        &self,
        document_id: Uuid,
        target_version_number: u64,
        user_id: Uuid,
        options: &RestoreOptions,
    ) -> RestoreResult<RollbackOutcome> {
        let target = self
            .store
            .version_by_number(document_id, target_version_number)?
            .ok_or(RestoreError::VersionNumberNotFound {
                document_id,
                version_number: target_version_number,
            })?;

        // Captured before the restore repoints the document
        let previous_current = self
            .store
            .current_version(document_id)?
            .ok_or(RestoreError::DocumentNotFound(document_id))?;

        let description = format!("Rollback to version {target_version_number}");
        let outcome =
            self.restore_version(document_id, target.id, user_id, Some(description), options)?;

        let versions_affected = previous_current
            .version_number
            .saturating_sub(target_version_number)
            .max(1);

        Ok(RollbackOutcome {
            rollback_version: outcome.restored_version,
            new_current_version: outcome.new_current_version,
            rollback_summary: RollbackSummary {
                versions_affected,
                preserved_versions: true,
                executed_at: Utc::now(),
            },
        })
    }

    fn materialize(
        &self,
        document_id: Uuid,
        target: Version,
        user_id: Uuid,
        description: Option<String>,
        options: &RestoreOptions,
    ) -> RestoreResult<RestoreOutcome> {
        if options.verify_integrity {
            self.verify(target.id, user_id, "restore target")?;
        }

        let content = self.versions.get_version_content(target.id, user_id)?;

        let mut ctx = VersionContext::new(user_id);
        ctx.change_description = description.or_else(|| {
            Some(format!("Restored from version {}", target.version_number))
        });

        let new_current = self.versions.create_version(document_id, &content, &ctx)?;

        if options.verify_integrity {
            self.verify(new_current.id, user_id, "restored version")?;
        }

        Ok(RestoreOutcome {
            restored_version: target,
            new_current_version: new_current,
        })
    }

    fn verify(&self, version_id: Uuid, user_id: Uuid, what: &str) -> RestoreResult<()> {
        let report = self.integrity.validate_version(version_id, user_id)?;
        if !report.is_clean() {
            return Err(RestoreError::IntegrityCheckFailed {
                version_id,
                detail: format!("{what} failed integrity validation"),
            });
        }
        Ok(())
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
