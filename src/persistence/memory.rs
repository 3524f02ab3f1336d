//! In-memory persistence backend
//!
//! Reference implementation over a single `RwLock`: every commit runs
//! under the write lock, which is what serializes the per-document
//! critical sections. Readers take the read lock and therefore observe
//! a consistent snapshot. A database-backed implementation would use
//! row locks or serializable transactions instead.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::versioning::{Document, SortOrder, Version};
use crate::workflow::{Workflow, WorkflowStep};

use super::{
    Persistence, PersistenceError, PersistenceResult, VersionCommit, WorkflowTransition,
};

#[derive(Debug, Default)]
struct Tables {
    documents: HashMap<Uuid, Document>,
    versions: HashMap<Uuid, Version>,
    workflows: HashMap<Uuid, Workflow>,
    steps: HashMap<Uuid, WorkflowStep>,
    audit_entries: Vec<AuditEntry>,
}

impl Tables {
    fn blocking_workflow_for(&self, document_id: Uuid) -> Option<&Workflow> {
        self.workflows
            .values()
            .find(|w| w.document_id == document_id && w.status.is_blocking())
    }
}

/// In-memory implementation of [`Persistence`].
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    tables: RwLock<Tables>,
}

impl InMemoryPersistence {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PersistenceResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| PersistenceError::Internal("table lock poisoned".to_string()))
    }

    fn write(&self) -> PersistenceResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| PersistenceError::Internal("table lock poisoned".to_string()))
    }
}

impl Persistence for InMemoryPersistence {
    fn insert_document(&self, document: Document, initial: Version) -> PersistenceResult<()> {
        let mut tables = self.write()?;

        if tables.documents.contains_key(&document.id) {
            return Err(PersistenceError::DocumentAlreadyExists(document.id));
        }

        tables.versions.insert(initial.id, initial);
        tables.documents.insert(document.id, document);
        Ok(())
    }

    fn document(&self, id: Uuid) -> PersistenceResult<Option<Document>> {
        Ok(self.read()?.documents.get(&id).cloned())
    }

    fn mark_document_deleted(&self, id: Uuid) -> PersistenceResult<()> {
        let mut tables = self.write()?;
        let document = tables
            .documents
            .get_mut(&id)
            .ok_or(PersistenceError::DocumentNotFound(id))?;
        document.is_deleted = true;
        Ok(())
    }

    fn commit_version(&self, commit: VersionCommit) -> PersistenceResult<()> {
        let mut tables = self.write()?;

        // Everything below runs under the write lock: the CAS check,
        // the lock re-check, and the three-row mutation are one unit.
        let document = tables
            .documents
            .get(&commit.document_id)
            .ok_or(PersistenceError::DocumentNotFound(commit.document_id))?;

        if document.is_deleted {
            return Err(PersistenceError::DocumentNotFound(commit.document_id));
        }

        if document.current_version_id != commit.expected_current {
            return Err(PersistenceError::CurrentVersionConflict {
                document_id: commit.document_id,
                expected: commit.expected_current,
                found: document.current_version_id,
            });
        }

        if commit.require_unlocked {
            if let Some(workflow) = tables.blocking_workflow_for(commit.document_id) {
                return Err(PersistenceError::DocumentLocked {
                    document_id: commit.document_id,
                    workflow_id: workflow.id,
                });
            }
        }

        let previous_id = commit.expected_current;
        if let Some(previous) = tables.versions.get_mut(&previous_id) {
            previous.is_current = false;
        } else {
            return Err(PersistenceError::VersionNotFound(previous_id));
        }

        let new_id = commit.version.id;
        tables.versions.insert(new_id, commit.version);
        if let Some(document) = tables.documents.get_mut(&commit.document_id) {
            document.current_version_id = new_id;
        }

        Ok(())
    }

    fn version(&self, id: Uuid) -> PersistenceResult<Option<Version>> {
        Ok(self.read()?.versions.get(&id).cloned())
    }

    fn version_by_number(
        &self,
        document_id: Uuid,
        version_number: u64,
    ) -> PersistenceResult<Option<Version>> {
        Ok(self
            .read()?
            .versions
            .values()
            .find(|v| v.document_id == document_id && v.version_number == version_number)
            .cloned())
    }

    fn current_version(&self, document_id: Uuid) -> PersistenceResult<Option<Version>> {
        let tables = self.read()?;
        let Some(document) = tables.documents.get(&document_id) else {
            return Ok(None);
        };
        Ok(tables.versions.get(&document.current_version_id).cloned())
    }

    fn versions_for_document(
        &self,
        document_id: Uuid,
        sort: SortOrder,
        limit: usize,
        offset: usize,
    ) -> PersistenceResult<(Vec<Version>, bool)> {
        let tables = self.read()?;

        let mut versions: Vec<Version> = tables
            .versions
            .values()
            .filter(|v| v.document_id == document_id)
            .cloned()
            .collect();

        match sort {
            SortOrder::Ascending => versions.sort_by_key(|v| v.version_number),
            SortOrder::Descending => {
                versions.sort_by_key(|v| std::cmp::Reverse(v.version_number))
            }
        }

        let total = versions.len();
        let page: Vec<Version> = versions.into_iter().skip(offset).take(limit).collect();
        let has_more = offset + page.len() < total;

        Ok((page, has_more))
    }

    fn insert_workflow(
        &self,
        workflow: Workflow,
        steps: Vec<WorkflowStep>,
    ) -> PersistenceResult<()> {
        let mut tables = self.write()?;

        if !tables.documents.contains_key(&workflow.document_id) {
            return Err(PersistenceError::DocumentNotFound(workflow.document_id));
        }

        for step in steps {
            tables.steps.insert(step.id, step);
        }
        tables.workflows.insert(workflow.id, workflow);
        Ok(())
    }

    fn workflow(&self, id: Uuid) -> PersistenceResult<Option<Workflow>> {
        Ok(self.read()?.workflows.get(&id).cloned())
    }

    fn step(&self, id: Uuid) -> PersistenceResult<Option<WorkflowStep>> {
        Ok(self.read()?.steps.get(&id).cloned())
    }

    fn steps_for_workflow(&self, workflow_id: Uuid) -> PersistenceResult<Vec<WorkflowStep>> {
        let tables = self.read()?;
        let mut steps: Vec<WorkflowStep> = tables
            .steps
            .values()
            .filter(|s| s.workflow_id == workflow_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.step_number);
        Ok(steps)
    }

    fn blocking_workflow(&self, document_id: Uuid) -> PersistenceResult<Option<Workflow>> {
        Ok(self.read()?.blocking_workflow_for(document_id).cloned())
    }

    fn commit_transition(&self, transition: WorkflowTransition) -> PersistenceResult<()> {
        let mut tables = self.write()?;

        let workflow_id = transition.workflow.id;
        let stored = tables
            .workflows
            .get(&workflow_id)
            .ok_or(PersistenceError::WorkflowNotFound(workflow_id))?;

        // Activation must not produce a second blocking workflow on the
        // same document. Checked under the write lock.
        let activating = !stored.status.is_blocking() && transition.workflow.status.is_blocking();
        if activating {
            if let Some(existing) = tables.blocking_workflow_for(transition.workflow.document_id) {
                if existing.id != workflow_id {
                    return Err(PersistenceError::WorkflowConflict {
                        document_id: transition.workflow.document_id,
                        existing_workflow_id: existing.id,
                    });
                }
            }
        }

        if let Some(step) = transition.step {
            if !tables.steps.contains_key(&step.id) {
                return Err(PersistenceError::StepNotFound(step.id));
            }
            tables.steps.insert(step.id, step);
        }
        tables.workflows.insert(workflow_id, transition.workflow);
        Ok(())
    }

    fn append_audit(&self, entry: AuditEntry) -> PersistenceResult<()> {
        self.write()?.audit_entries.push(entry);
        Ok(())
    }

    fn audit_trail(&self, workflow_id: Uuid) -> PersistenceResult<Vec<AuditEntry>> {
        let tables = self.read()?;
        let mut trail: Vec<AuditEntry> = tables
            .audit_entries
            .iter()
            .filter(|e| e.workflow_id == Some(workflow_id))
            .cloned()
            .collect();
        trail.sort_by_key(|e| e.performed_at);
        Ok(trail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versioning::EncryptionMetadata;
    use crate::workflow::WorkflowStatus;
    use chrono::Utc;

    fn sample_version(document_id: Uuid, number: u64, is_current: bool) -> Version {
        Version {
            id: Uuid::new_v4(),
            document_id,
            version_number: number,
            size: 4,
            checksum: format!("checksum-{number}"),
            storage_path: format!("blob-{number}"),
            encryption: EncryptionMetadata {
                key_id: "key-1".to_string(),
                iv: "aXY=".to_string(),
                auth_tag: "dGFn".to_string(),
            },
            created_at: Utc::now(),
            created_by: Uuid::new_v4(),
            change_description: None,
            is_current,
        }
    }

    fn sample_document_with_version() -> (Document, Version) {
        let document_id = Uuid::new_v4();
        let version = sample_version(document_id, 1, true);
        let document = Document {
            id: document_id,
            case_id: Uuid::new_v4(),
            title: "Engagement letter".to_string(),
            current_version_id: version.id,
            is_deleted: false,
            created_at: Utc::now(),
            created_by: Uuid::new_v4(),
        };
        (document, version)
    }

    fn sample_workflow(document_id: Uuid, status: WorkflowStatus) -> Workflow {
        Workflow {
            id: Uuid::new_v4(),
            document_id,
            name: "Partner review".to_string(),
            status,
            current_step_number: 0,
            created_at: Utc::now(),
            created_by: Uuid::new_v4(),
            completed_at: None,
        }
    }

    #[test]
    fn test_insert_and_fetch_document() {
        let store = InMemoryPersistence::new();
        let (document, version) = sample_document_with_version();

        store.insert_document(document.clone(), version.clone()).unwrap();

        let fetched = store.document(document.id).unwrap().unwrap();
        assert_eq!(fetched.current_version_id, version.id);
        assert!(store.version(version.id).unwrap().is_some());
    }

    #[test]
    fn test_commit_version_swaps_current_pointer() {
        let store = InMemoryPersistence::new();
        let (document, v1) = sample_document_with_version();
        store.insert_document(document.clone(), v1.clone()).unwrap();

        let v2 = sample_version(document.id, 2, true);
        store
            .commit_version(VersionCommit {
                document_id: document.id,
                version: v2.clone(),
                expected_current: v1.id,
                require_unlocked: true,
            })
            .unwrap();

        let old = store.version(v1.id).unwrap().unwrap();
        let new = store.version(v2.id).unwrap().unwrap();
        let doc = store.document(document.id).unwrap().unwrap();
        assert!(!old.is_current);
        assert!(new.is_current);
        assert_eq!(doc.current_version_id, v2.id);
    }

    #[test]
    fn test_commit_version_cas_conflict() {
        let store = InMemoryPersistence::new();
        let (document, v1) = sample_document_with_version();
        store.insert_document(document.clone(), v1.clone()).unwrap();

        let stale = Uuid::new_v4();
        let result = store.commit_version(VersionCommit {
            document_id: document.id,
            version: sample_version(document.id, 2, true),
            expected_current: stale,
            require_unlocked: true,
        });

        assert!(matches!(
            result,
            Err(PersistenceError::CurrentVersionConflict { .. })
        ));
        // Nothing visible from the failed commit.
        let doc = store.document(document.id).unwrap().unwrap();
        assert_eq!(doc.current_version_id, v1.id);
    }

    #[test]
    fn test_commit_version_rejected_while_locked() {
        let store = InMemoryPersistence::new();
        let (document, v1) = sample_document_with_version();
        store.insert_document(document.clone(), v1.clone()).unwrap();

        let workflow = sample_workflow(document.id, WorkflowStatus::Active);
        store.insert_workflow(workflow, Vec::new()).unwrap();

        let result = store.commit_version(VersionCommit {
            document_id: document.id,
            version: sample_version(document.id, 2, true),
            expected_current: v1.id,
            require_unlocked: true,
        });

        assert!(matches!(result, Err(PersistenceError::DocumentLocked { .. })));
    }

    #[test]
    fn test_on_hold_workflow_blocks() {
        let store = InMemoryPersistence::new();
        let (document, v1) = sample_document_with_version();
        store.insert_document(document.clone(), v1).unwrap();

        let workflow = sample_workflow(document.id, WorkflowStatus::OnHold);
        store.insert_workflow(workflow.clone(), Vec::new()).unwrap();

        let blocking = store.blocking_workflow(document.id).unwrap();
        assert_eq!(blocking.map(|w| w.id), Some(workflow.id));
    }

    #[test]
    fn test_activation_conflict_on_second_blocking_workflow() {
        let store = InMemoryPersistence::new();
        let (document, v1) = sample_document_with_version();
        store.insert_document(document.clone(), v1).unwrap();

        let active = sample_workflow(document.id, WorkflowStatus::Active);
        store.insert_workflow(active, Vec::new()).unwrap();

        let mut draft = sample_workflow(document.id, WorkflowStatus::Draft);
        store.insert_workflow(draft.clone(), Vec::new()).unwrap();

        draft.status = WorkflowStatus::Active;
        let result = store.commit_transition(WorkflowTransition {
            workflow: draft,
            step: None,
        });

        assert!(matches!(
            result,
            Err(PersistenceError::WorkflowConflict { .. })
        ));
    }

    #[test]
    fn test_version_pagination() {
        let store = InMemoryPersistence::new();
        let (document, v1) = sample_document_with_version();
        store.insert_document(document.clone(), v1.clone()).unwrap();

        let mut previous = v1.id;
        for number in 2..=5 {
            let version = sample_version(document.id, number, true);
            let id = version.id;
            store
                .commit_version(VersionCommit {
                    document_id: document.id,
                    version,
                    expected_current: previous,
                    require_unlocked: false,
                })
                .unwrap();
            previous = id;
        }

        let (page, has_more) = store
            .versions_for_document(document.id, SortOrder::Descending, 2, 0)
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].version_number, 5);
        assert_eq!(page[1].version_number, 4);
        assert!(has_more);

        let (tail, has_more) = store
            .versions_for_document(document.id, SortOrder::Ascending, 10, 3)
            .unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].version_number, 4);
        assert!(!has_more);
    }

    #[test]
    fn test_audit_trail_filters_by_workflow() {
        let store = InMemoryPersistence::new();
        let workflow_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();
        let user = Uuid::new_v4();

        store
            .append_audit(
                crate::audit::AuditEntry::new(crate::audit::AuditAction::WorkflowStarted, user)
                    .with_workflow(workflow_id),
            )
            .unwrap();
        store
            .append_audit(
                crate::audit::AuditEntry::new(crate::audit::AuditAction::WorkflowStarted, user)
                    .with_workflow(other_id),
            )
            .unwrap();

        let trail = store.audit_trail(workflow_id).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].workflow_id, Some(workflow_id));
    }
}
