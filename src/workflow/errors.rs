//! Workflow errors

use thiserror::Error;
use uuid::Uuid;

use crate::persistence::PersistenceError;

use super::types::WorkflowStatus;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Workflow errors.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("Workflow step not found: {0}")]
    StepNotFound(Uuid),

    #[error("A workflow requires at least one step")]
    EmptySteps,

    /// Rejected by the exhaustive transition table.
    #[error("Invalid transition for workflow {workflow_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        workflow_id: Uuid,
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    #[error("Workflow {workflow_id} is not active (status: {status:?})")]
    WorkflowNotActive {
        workflow_id: Uuid,
        status: WorkflowStatus,
    },

    /// Out-of-order completion: only the current step may be decided.
    #[error(
        "Step {step_number} of workflow {workflow_id} is not the current step ({current_step_number})"
    )]
    StepOutOfOrder {
        workflow_id: Uuid,
        step_number: u32,
        current_step_number: u32,
    },

    #[error("Step {0} has already been decided")]
    StepAlreadyDecided(Uuid),

    /// At most one blocking workflow may exist per document.
    #[error("Document {document_id} already has blocking workflow {existing_workflow_id}")]
    DocumentHasBlockingWorkflow {
        document_id: Uuid,
        existing_workflow_id: Uuid,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
