//! Observable lifecycle events
//!
//! Every state-changing operation in the vault emits exactly one typed
//! event. Events are explicit: no free-form event strings in the
//! services.

use super::logger::Severity;

/// Observable events in the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Documents & versions
    /// A document was registered with its initial version.
    DocumentRegistered,
    /// A document was soft-deleted.
    DocumentDeleted,
    /// A new version became current.
    VersionCreated,
    /// A create was rejected because content was unchanged.
    VersionUnchanged,

    // Restore
    /// Restoration started.
    RestoreStart,
    /// Restoration completed; a new current version exists.
    RestoreComplete,
    /// Restoration failed; history is unchanged.
    RestoreFailed,

    // Integrity
    /// An integrity check found a violation.
    IntegrityViolation,

    // Workflow
    /// A workflow was created in Draft.
    WorkflowCreated,
    /// A workflow transitioned Draft → Active.
    WorkflowStarted,
    /// A step was approved.
    WorkflowStepCompleted,
    /// A step was rejected; workflow parked OnHold.
    WorkflowStepRejected,
    /// The final step was approved; workflow terminal.
    WorkflowCompleted,

    // Collaborator failures (never fatal)
    /// An audit append failed; the primary operation proceeded.
    AuditAppendFailed,
    /// A notification delivery failed; the primary operation proceeded.
    NotifyFailed,
}

impl Event {
    /// Returns the event name string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DocumentRegistered => "DOCUMENT_REGISTERED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::VersionCreated => "VERSION_CREATED",
            Event::VersionUnchanged => "VERSION_UNCHANGED",
            Event::RestoreStart => "RESTORE_START",
            Event::RestoreComplete => "RESTORE_COMPLETE",
            Event::RestoreFailed => "RESTORE_FAILED",
            Event::IntegrityViolation => "INTEGRITY_VIOLATION",
            Event::WorkflowCreated => "WORKFLOW_CREATED",
            Event::WorkflowStarted => "WORKFLOW_STARTED",
            Event::WorkflowStepCompleted => "WORKFLOW_STEP_COMPLETED",
            Event::WorkflowStepRejected => "WORKFLOW_STEP_REJECTED",
            Event::WorkflowCompleted => "WORKFLOW_COMPLETED",
            Event::AuditAppendFailed => "AUDIT_APPEND_FAILED",
            Event::NotifyFailed => "NOTIFY_FAILED",
        }
    }

    /// The severity this event logs at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::AuditAppendFailed | Event::NotifyFailed => Severity::Warn,
            Event::IntegrityViolation | Event::RestoreFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
