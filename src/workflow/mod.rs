//! Workflow engine
//!
//! Review/approval workflows over documents, and the document-lock
//! predicate that gates the version store:
//! - `WorkflowStatus` / `Decision` - closed state machine and tagged
//!   decision union
//! - `WorkflowEngine` - creation, deterministic step sequencing,
//!   progress, reports, and the lock predicate
//!
//! A workflow's only systemic effect is locking and unlocking its
//! document; it never touches version rows itself.

mod engine;
mod errors;
mod types;

pub use engine::WorkflowEngine;
pub use errors::{WorkflowError, WorkflowResult};
pub use types::{
    Assignee, Decision, ModifyDecision, StepOutcome, StepSpec, StepStatus, StepType, Workflow,
    WorkflowProgress, WorkflowReport, WorkflowSpec, WorkflowStatistics, WorkflowStatus,
    WorkflowStep,
};
