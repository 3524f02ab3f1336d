//! Persistence collaborator
//!
//! Abstraction over the shared persistent store. Logical tables:
//! `documents`, `document_versions`, `document_workflows`,
//! `workflow_steps`, `audit_entries`.
//!
//! The contract encodes the two critical sections of the system:
//! - [`Persistence::commit_version`] performs the current-pointer swap
//!   as one atomic unit, compare-and-swapped against the expected
//!   current version and re-checked against the workflow lock
//! - [`Persistence::commit_transition`] applies a workflow/step status
//!   change as one atomic unit, rejecting a second blocking workflow on
//!   the same document at activation
//!
//! Readers observe consistent snapshots: a partially committed version
//! or transition is never visible.

mod memory;

pub use memory::InMemoryPersistence;

use thiserror::Error;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::versioning::{Document, SortOrder, Version};
use crate::workflow::{Workflow, WorkflowStep};

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence errors.
///
/// Conflict variants surface lost races on the per-document critical
/// section; callers may retry after re-reading.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Document already exists: {0}")]
    DocumentAlreadyExists(Uuid),

    #[error("Version not found: {0}")]
    VersionNotFound(Uuid),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("Workflow step not found: {0}")]
    StepNotFound(Uuid),

    #[error("Current version conflict on document {document_id}: expected {expected}, found {found}")]
    CurrentVersionConflict {
        document_id: Uuid,
        expected: Uuid,
        found: Uuid,
    },

    #[error("Document {document_id} is locked by workflow {workflow_id}")]
    DocumentLocked {
        document_id: Uuid,
        workflow_id: Uuid,
    },

    #[error("Document {document_id} already has blocking workflow {existing_workflow_id}")]
    WorkflowConflict {
        document_id: Uuid,
        existing_workflow_id: Uuid,
    },

    #[error("Internal persistence error: {0}")]
    Internal(String),
}

/// An atomic new-version commit.
///
/// Applied as one unit: insert the version row with `is_current = true`,
/// flip the previous current's flag to false, and repoint
/// `Document::current_version_id`. Nothing is visible if any part fails.
#[derive(Debug, Clone)]
pub struct VersionCommit {
    /// The document receiving the version.
    pub document_id: Uuid,
    /// The fully built version row. `version_number` must be the
    /// successor of the expected current version's number.
    pub version: Version,
    /// Compare-and-swap guard: the commit fails with
    /// [`PersistenceError::CurrentVersionConflict`] unless the
    /// document's current version id still equals this value.
    pub expected_current: Uuid,
    /// When true, the commit fails with
    /// [`PersistenceError::DocumentLocked`] if a blocking workflow
    /// exists at commit time. Closes the check-then-act window between
    /// the caller's lock probe and the write.
    pub require_unlocked: bool,
}

/// An atomic workflow transition.
#[derive(Debug, Clone)]
pub struct WorkflowTransition {
    /// The workflow row after the transition.
    pub workflow: Workflow,
    /// The decided step after the transition, when the transition
    /// involves one (step completion). `None` for activation.
    pub step: Option<WorkflowStep>,
}

/// CRUD plus multi-row transactional commits over the logical tables.
///
/// Implementations must serialize writes per document so that two
/// concurrent writers can never allocate the same version number, leave
/// two versions current, or write a version after a workflow
/// concurrently activated.
pub trait Persistence: Send + Sync {
    // documents

    /// Insert a document together with its initial version (number 1,
    /// current) as one atomic unit.
    fn insert_document(&self, document: Document, initial: Version) -> PersistenceResult<()>;

    /// Fetch a document row.
    fn document(&self, id: Uuid) -> PersistenceResult<Option<Document>>;

    /// Soft-delete a document. Versions are retained.
    fn mark_document_deleted(&self, id: Uuid) -> PersistenceResult<()>;

    // versions

    /// Apply an atomic new-version commit. See [`VersionCommit`].
    fn commit_version(&self, commit: VersionCommit) -> PersistenceResult<()>;

    /// Fetch a version row.
    fn version(&self, id: Uuid) -> PersistenceResult<Option<Version>>;

    /// Fetch a version by its number within a document.
    fn version_by_number(
        &self,
        document_id: Uuid,
        version_number: u64,
    ) -> PersistenceResult<Option<Version>>;

    /// The current version for a document.
    fn current_version(&self, document_id: Uuid) -> PersistenceResult<Option<Version>>;

    /// One page of a document's versions plus a has-more flag.
    fn versions_for_document(
        &self,
        document_id: Uuid,
        sort: SortOrder,
        limit: usize,
        offset: usize,
    ) -> PersistenceResult<(Vec<Version>, bool)>;

    // workflows

    /// Insert a workflow with its steps as one atomic unit.
    fn insert_workflow(
        &self,
        workflow: Workflow,
        steps: Vec<WorkflowStep>,
    ) -> PersistenceResult<()>;

    /// Fetch a workflow row.
    fn workflow(&self, id: Uuid) -> PersistenceResult<Option<Workflow>>;

    /// Fetch a step row.
    fn step(&self, id: Uuid) -> PersistenceResult<Option<WorkflowStep>>;

    /// All steps of a workflow, ordered by step number.
    fn steps_for_workflow(&self, workflow_id: Uuid) -> PersistenceResult<Vec<WorkflowStep>>;

    /// The blocking (Active or OnHold) workflow for a document, if any.
    fn blocking_workflow(&self, document_id: Uuid) -> PersistenceResult<Option<Workflow>>;

    /// Apply an atomic workflow transition. An activation (stored row
    /// Draft, new row Active) fails with
    /// [`PersistenceError::WorkflowConflict`] if another blocking
    /// workflow exists for the same document at commit time.
    fn commit_transition(&self, transition: WorkflowTransition) -> PersistenceResult<()>;

    // audit

    /// Append an audit entry.
    fn append_audit(&self, entry: AuditEntry) -> PersistenceResult<()>;

    /// The chronological audit trail for a workflow.
    fn audit_trail(&self, workflow_id: Uuid) -> PersistenceResult<Vec<AuditEntry>>;
}
