//! Audit trail recording
//!
//! Every workflow transition and version mutation is recorded:
//! - Entries are append-only and immutable once written
//! - Recording is fire-and-forget: a failed append never rolls back the
//!   primary operation, but is surfaced as a WARN log by callers
//! - No background purging or retention policies (external concerns)

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::persistence::Persistence;

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Audit recording errors. Never fatal to the primary operation.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("Audit I/O error: {0}")]
    Io(String),

    #[error("Audit persistence error: {0}")]
    Persistence(String),
}

/// The action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A document was registered with its initial version.
    DocumentRegistered,
    /// A new version became current.
    VersionCreated,
    /// A historical version was materialized as a new current version.
    VersionRestored,
    /// A document was soft-deleted.
    DocumentDeleted,
    /// A workflow was created in Draft.
    WorkflowCreated,
    /// A workflow transitioned Draft → Active.
    WorkflowStarted,
    /// A step was approved and the workflow advanced.
    StepCompleted,
    /// A step was rejected and the workflow parked OnHold.
    StepRejected,
    /// The final step was approved; workflow terminal.
    WorkflowCompleted,
}

impl AuditAction {
    /// Returns the action name string.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::DocumentRegistered => "DOCUMENT_REGISTERED",
            AuditAction::VersionCreated => "VERSION_CREATED",
            AuditAction::VersionRestored => "VERSION_RESTORED",
            AuditAction::DocumentDeleted => "DOCUMENT_DELETED",
            AuditAction::WorkflowCreated => "WORKFLOW_CREATED",
            AuditAction::WorkflowStarted => "WORKFLOW_STARTED",
            AuditAction::StepCompleted => "STEP_COMPLETED",
            AuditAction::StepRejected => "STEP_REJECTED",
            AuditAction::WorkflowCompleted => "WORKFLOW_COMPLETED",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// The workflow this entry belongs to, if any.
    pub workflow_id: Option<Uuid>,
    /// The document this entry concerns, if any.
    pub document_id: Option<Uuid>,
    /// What happened.
    pub action: AuditAction,
    /// The acting user.
    pub performed_by: Uuid,
    /// When it happened.
    pub performed_at: DateTime<Utc>,
    /// Action-specific detail payload.
    pub details: serde_json::Value,
}

impl AuditEntry {
    /// Create a new entry timestamped now.
    pub fn new(action: AuditAction, performed_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: None,
            document_id: None,
            action,
            performed_by,
            performed_at: Utc::now(),
            details: serde_json::Value::Null,
        }
    }

    /// Attach the workflow this entry belongs to.
    pub fn with_workflow(mut self, workflow_id: Uuid) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    /// Attach the document this entry concerns.
    pub fn with_document(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }

    /// Attach a detail payload.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Append-only audit recorder.
///
/// The entry must be visible to trail readers after `record` returns.
pub trait AuditRecorder: Send + Sync {
    /// Append an entry.
    fn record(&self, entry: &AuditEntry) -> AuditResult<()>;
}

/// Recorder that appends into the persistence layer's `audit_entries`
/// table. This is the standard wiring: entries recorded here are the
/// ones `get_audit_trail` reads back.
pub struct StoreAuditRecorder {
    store: Arc<dyn Persistence>,
}

impl StoreAuditRecorder {
    /// Wrap a persistence backend.
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self { store }
    }
}

impl AuditRecorder for StoreAuditRecorder {
    fn record(&self, entry: &AuditEntry) -> AuditResult<()> {
        self.store
            .append_audit(entry.clone())
            .map_err(|e| AuditError::Persistence(e.to_string()))
    }
}

/// File-based recorder: one JSON entry per line, synced after each
/// write. Suitable as a durable mirror next to the primary store.
pub struct FileAuditRecorder {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditRecorder {
    /// Open or create an audit log file.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditRecorder for FileAuditRecorder {
    fn record(&self, entry: &AuditEntry) -> AuditResult<()> {
        let json = serde_json::to_string(entry).map_err(|e| AuditError::Io(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AuditError::Io("audit writer lock poisoned".to_string()))?;
        writeln!(writer, "{}", json).map_err(|e| AuditError::Io(e.to_string()))?;
        writer.flush().map_err(|e| AuditError::Io(e.to_string()))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| AuditError::Io(e.to_string()))
    }
}

/// In-memory recorder for tests.
#[derive(Default)]
pub struct MemoryAuditRecorder {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries, in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit lock poisoned").clone()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit lock poisoned").len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditRecorder for MemoryAuditRecorder {
    fn record(&self, entry: &AuditEntry) -> AuditResult<()> {
        self.entries
            .lock()
            .map_err(|_| AuditError::Io("audit lock poisoned".to_string()))?
            .push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_entry_builder() {
        let user = Uuid::new_v4();
        let workflow = Uuid::new_v4();
        let entry = AuditEntry::new(AuditAction::WorkflowStarted, user)
            .with_workflow(workflow)
            .with_details(serde_json::json!({"step_count": 3}));

        assert_eq!(entry.action, AuditAction::WorkflowStarted);
        assert_eq!(entry.workflow_id, Some(workflow));
        assert_eq!(entry.details["step_count"], 3);
    }

    #[test]
    fn test_memory_recorder_appends_in_order() {
        let recorder = MemoryAuditRecorder::new();
        let user = Uuid::new_v4();

        recorder
            .record(&AuditEntry::new(AuditAction::WorkflowStarted, user))
            .unwrap();
        recorder
            .record(&AuditEntry::new(AuditAction::StepCompleted, user))
            .unwrap();

        let entries = recorder.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::WorkflowStarted);
        assert_eq!(entries[1].action, AuditAction::StepCompleted);
    }

    #[test]
    fn test_file_recorder_writes_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let recorder = FileAuditRecorder::open(&path).unwrap();
        let entry = AuditEntry::new(AuditAction::VersionCreated, Uuid::new_v4())
            .with_document(Uuid::new_v4());
        recorder.record(&entry).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("VERSION_CREATED"));

        let parsed: AuditEntry = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.id, entry.id);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(AuditAction::StepRejected.to_string(), "STEP_REJECTED");
        assert_eq!(
            AuditAction::WorkflowCompleted.to_string(),
            "WORKFLOW_COMPLETED"
        );
    }
}
