//! Workflow domain types
//!
//! Workflows are ordered review/approval pipelines over a single
//! document. Transitions follow a closed state machine:
//!
//! ```text
//! Draft ──start──▶ Active ──approve last step──▶ Completed (terminal)
//!                    │
//!                    └──reject any step──▶ OnHold
//! ```
//!
//! There is no OnHold → Active resume path: a rejected workflow stays
//! parked and corrective work happens in a new workflow. Both Active
//! and OnHold block document modification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow lifecycle status.
///
/// Illegal transitions are rejected via [`WorkflowStatus::can_transition`],
/// never by string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Created but not started. Does not lock the document.
    Draft,
    /// Steps are being worked. Locks the document.
    Active,
    /// A step was rejected. Still locks the document.
    OnHold,
    /// All steps approved. Terminal; unlocks the document.
    Completed,
}

impl WorkflowStatus {
    /// The exhaustive transition table.
    pub fn can_transition(self, next: WorkflowStatus) -> bool {
        matches!(
            (self, next),
            (WorkflowStatus::Draft, WorkflowStatus::Active)
                | (WorkflowStatus::Active, WorkflowStatus::OnHold)
                | (WorkflowStatus::Active, WorkflowStatus::Completed)
        )
    }

    /// True once no further transitions exist.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed)
    }

    /// True while this status blocks document modification.
    ///
    /// OnHold still locks: any non-terminal, non-Draft workflow blocks
    /// new versions until the workflow completes.
    pub fn is_blocking(self) -> bool {
        matches!(self, WorkflowStatus::Active | WorkflowStatus::OnHold)
    }

    /// Returns the status name string.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "DRAFT",
            WorkflowStatus::Active => "ACTIVE",
            WorkflowStatus::OnHold => "ON_HOLD",
            WorkflowStatus::Completed => "COMPLETED",
        }
    }
}

/// What kind of action a step demands from its assignee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    /// Read and comment.
    Review,
    /// Sign off or reject.
    Approval,
}

/// Who a step is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Assignee {
    /// A specific user.
    User(Uuid),
    /// Any member of a role.
    Role(String),
    /// Any member of a group.
    Group(String),
}

/// Per-step completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// Not yet decided.
    Pending,
    /// Approved by the assignee.
    Completed,
    /// Rejected; parks the workflow OnHold.
    Rejected,
}

/// The decision recorded when a step completes.
///
/// Rejections carry revision notes; approvals do not. The variants make
/// that structural instead of a bag of optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The step was approved.
    Approved {
        /// Optional reviewer comments.
        comments: Option<String>,
    },
    /// The step was rejected.
    Rejected {
        /// Optional reviewer comments.
        comments: Option<String>,
        /// What must change before resubmission.
        revision_notes: Option<String>,
    },
}

impl Decision {
    /// True for the approved variant.
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved { .. })
    }

    /// The step status this decision maps to.
    pub fn step_status(&self) -> StepStatus {
        match self {
            Decision::Approved { .. } => StepStatus::Completed,
            Decision::Rejected { .. } => StepStatus::Rejected,
        }
    }
}

/// A review/approval workflow over one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow ID.
    pub id: Uuid,
    /// The document this workflow gates.
    pub document_id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Lifecycle status.
    pub status: WorkflowStatus,
    /// The step currently awaiting a decision (1..N). Zero while Draft.
    pub current_step_number: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Creating user.
    pub created_by: Uuid,
    /// Set when the workflow reaches Completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A single ordered step within a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique step ID.
    pub id: Uuid,
    /// Owning workflow.
    pub workflow_id: Uuid,
    /// Position in the workflow, 1..N.
    pub step_number: u32,
    /// Human-readable name.
    pub name: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Review or approval.
    pub step_type: StepType,
    /// Who decides this step.
    pub assignee: Assignee,
    /// Advisory time limit in hours. Never auto-enforced.
    pub time_limit_hours: Option<u32>,
    /// Completion status.
    pub status: StepStatus,
    /// The recorded decision, once made.
    pub decision: Option<Decision>,
    /// User who decided the step.
    pub decided_by: Option<Uuid>,
    /// When the step was decided.
    pub decided_at: Option<DateTime<Utc>>,
}

/// Input for creating a workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    /// The document to gate.
    pub document_id: Uuid,
    /// Workflow name.
    pub name: String,
    /// Steps in execution order. Must be non-empty.
    pub steps: Vec<StepSpec>,
}

/// Input for one workflow step.
#[derive(Debug, Clone)]
pub struct StepSpec {
    /// Step name.
    pub name: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Review or approval.
    pub step_type: StepType,
    /// Who decides this step.
    pub assignee: Assignee,
    /// Advisory time limit in hours.
    pub time_limit_hours: Option<u32>,
}

impl StepSpec {
    /// A bare approval step assigned to a user.
    pub fn approval(name: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            description: None,
            step_type: StepType::Approval,
            assignee: Assignee::User(user_id),
            time_limit_hours: None,
        }
    }

    /// A bare review step assigned to a user.
    pub fn review(name: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            description: None,
            step_type: StepType::Review,
            assignee: Assignee::User(user_id),
            time_limit_hours: None,
        }
    }
}

/// Progress summary for a workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowProgress {
    /// Current status.
    pub status: WorkflowStatus,
    /// Total number of steps.
    pub total_steps: u32,
    /// Steps with status Completed.
    pub completed_steps: u32,
    /// The step currently awaiting a decision.
    pub current_step_number: u32,
    /// completed_steps / total_steps, in [0, 1].
    pub progress: f64,
}

/// Outcome of a modifiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyDecision {
    /// True if the caller may write a new version.
    pub can_modify: bool,
    /// Populated when modification is denied; mentions "locked" while a
    /// blocking workflow exists.
    pub reason: Option<String>,
}

impl ModifyDecision {
    /// Modification permitted.
    pub fn allowed() -> Self {
        Self {
            can_modify: true,
            reason: None,
        }
    }

    /// Modification denied with a reason.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            can_modify: false,
            reason: Some(reason.into()),
        }
    }
}

/// Step counts for a workflow report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStatistics {
    /// Total number of steps.
    pub total_steps: u32,
    /// Steps with status Completed.
    pub completed_steps: u32,
    /// Steps with status Rejected.
    pub rejected_steps: u32,
    /// Steps with status Pending.
    pub pending_steps: u32,
    /// completed_steps / total_steps, in [0, 1].
    pub progress: f64,
}

/// Full report over a workflow: rows, trail, statistics.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    /// The workflow row.
    pub workflow: Workflow,
    /// All steps in order.
    pub steps: Vec<WorkflowStep>,
    /// Chronological audit trail.
    pub audit_trail: Vec<crate::audit::AuditEntry>,
    /// Step counts and progress.
    pub statistics: WorkflowStatistics,
}

/// Post-transition snapshot returned by `complete_step`.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The workflow after the transition.
    pub workflow: Workflow,
    /// The decided step after the transition.
    pub step: WorkflowStep,
}
