//! WorkflowEngine - deterministic step sequencing and the document lock
//!
//! The engine advances workflows through the closed state machine and
//! is the authority on the document-lock predicate: a document is
//! locked exactly while a blocking (Active or OnHold) workflow exists
//! for it. The version store consults that predicate through the
//! [`LockGate`] seam; the persistence layer re-checks it inside every
//! version commit.
//!
//! Transitions are applied as atomic workflow+step commits. An
//! interrupted transition is never partially visible.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::access::{AccessControl, Permission};
use crate::audit::{AuditAction, AuditEntry, AuditRecorder};
use crate::notify::{Notification, Notifier};
use crate::observability::{log_event, Event};
use crate::persistence::{Persistence, PersistenceError, WorkflowTransition};
use crate::versioning::{LockGate, LockState};

use super::errors::{WorkflowError, WorkflowResult};
use super::types::{
    Decision, ModifyDecision, StepOutcome, StepStatus, Workflow, WorkflowProgress, WorkflowReport,
    WorkflowSpec, WorkflowStatistics, WorkflowStatus, WorkflowStep,
};

/// The workflow service.
pub struct WorkflowEngine {
    store: Arc<dyn Persistence>,
    access: Arc<dyn AccessControl>,
    audit: Arc<dyn AuditRecorder>,
    notifier: Arc<dyn Notifier>,
}

impl WorkflowEngine {
    /// Construct an engine over injected collaborators.
    pub fn new(
        store: Arc<dyn Persistence>,
        access: Arc<dyn AccessControl>,
        audit: Arc<dyn AuditRecorder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            access,
            audit,
            notifier,
        }
    }

    /// Create a workflow in Draft with steps numbered 1..N in input
    /// order. Draft workflows do not lock the document.
    pub fn create_workflow(&self, spec: WorkflowSpec, user_id: Uuid) -> WorkflowResult<Workflow> {
        if spec.steps.is_empty() {
            return Err(WorkflowError::EmptySteps);
        }

        let document = self
            .store
            .document(spec.document_id)?
            .ok_or(WorkflowError::DocumentNotFound(spec.document_id))?;
        if document.is_deleted {
            return Err(WorkflowError::DocumentNotFound(spec.document_id));
        }

        self.check_manage_permission(user_id, spec.document_id)?;

        let now = Utc::now();
        let workflow = Workflow {
            id: Uuid::new_v4(),
            document_id: spec.document_id,
            name: spec.name,
            status: WorkflowStatus::Draft,
            current_step_number: 0,
            created_at: now,
            created_by: user_id,
            completed_at: None,
        };

        let steps: Vec<WorkflowStep> = spec
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| WorkflowStep {
                id: Uuid::new_v4(),
                workflow_id: workflow.id,
                step_number: index as u32 + 1,
                name: step.name,
                description: step.description,
                step_type: step.step_type,
                assignee: step.assignee,
                time_limit_hours: step.time_limit_hours,
                status: StepStatus::Pending,
                decision: None,
                decided_by: None,
                decided_at: None,
            })
            .collect();

        let total_steps = steps.len();
        self.store.insert_workflow(workflow.clone(), steps)?;

        self.record_audit(
            AuditEntry::new(AuditAction::WorkflowCreated, user_id)
                .with_workflow(workflow.id)
                .with_document(workflow.document_id)
                .with_details(serde_json::json!({
                    "name": workflow.name,
                    "total_steps": total_steps,
                })),
        );
        log_event(
            Event::WorkflowCreated,
            &[
                ("workflow_id", &workflow.id.to_string()),
                ("document_id", &workflow.document_id.to_string()),
                ("total_steps", &total_steps.to_string()),
            ],
        );

        Ok(workflow)
    }

    /// Transition a workflow Draft → Active. The document is locked
    /// from the moment this returns until the workflow completes.
    pub fn start_workflow(&self, workflow_id: Uuid, user_id: Uuid) -> WorkflowResult<Workflow> {
        let mut workflow = self.require_workflow(workflow_id)?;

        self.check_manage_permission(user_id, workflow.document_id)?;

        if !workflow.status.can_transition(WorkflowStatus::Active) {
            return Err(WorkflowError::InvalidTransition {
                workflow_id,
                from: workflow.status,
                to: WorkflowStatus::Active,
            });
        }

        if let Some(existing) = self.store.blocking_workflow(workflow.document_id)? {
            return Err(WorkflowError::DocumentHasBlockingWorkflow {
                document_id: workflow.document_id,
                existing_workflow_id: existing.id,
            });
        }

        workflow.status = WorkflowStatus::Active;
        workflow.current_step_number = 1;

        self.store
            .commit_transition(WorkflowTransition {
                workflow: workflow.clone(),
                step: None,
            })
            .map_err(|e| match e {
                PersistenceError::WorkflowConflict {
                    document_id,
                    existing_workflow_id,
                } => WorkflowError::DocumentHasBlockingWorkflow {
                    document_id,
                    existing_workflow_id,
                },
                other => WorkflowError::Persistence(other),
            })?;

        self.record_audit(
            AuditEntry::new(AuditAction::WorkflowStarted, user_id)
                .with_workflow(workflow.id)
                .with_document(workflow.document_id),
        );
        log_event(
            Event::WorkflowStarted,
            &[
                ("workflow_id", &workflow.id.to_string()),
                ("document_id", &workflow.document_id.to_string()),
            ],
        );

        Ok(workflow)
    }

    /// Decide the current step of an Active workflow.
    ///
    /// Approval advances the workflow (or completes it on the last
    /// step); rejection parks it OnHold. Deciding any step other than
    /// the current one fails without side effects.
    pub fn complete_step(
        &self,
        step_id: Uuid,
        decision: Decision,
        user_id: Uuid,
    ) -> WorkflowResult<StepOutcome> {
        let mut step = self
            .store
            .step(step_id)?
            .ok_or(WorkflowError::StepNotFound(step_id))?;
        let mut workflow = self.require_workflow(step.workflow_id)?;

        if workflow.status != WorkflowStatus::Active {
            return Err(WorkflowError::WorkflowNotActive {
                workflow_id: workflow.id,
                status: workflow.status,
            });
        }
        if step.step_number != workflow.current_step_number {
            return Err(WorkflowError::StepOutOfOrder {
                workflow_id: workflow.id,
                step_number: step.step_number,
                current_step_number: workflow.current_step_number,
            });
        }
        if step.status != StepStatus::Pending {
            return Err(WorkflowError::StepAlreadyDecided(step_id));
        }

        let total_steps = self.store.steps_for_workflow(workflow.id)?.len() as u32;
        let now = Utc::now();

        step.status = decision.step_status();
        step.decision = Some(decision.clone());
        step.decided_by = Some(user_id);
        step.decided_at = Some(now);

        let completed_workflow = match &decision {
            Decision::Approved { .. } => {
                let is_last = step.step_number == total_steps;
                if is_last {
                    // can_transition(Active, Completed) always holds here;
                    // the status check above pinned the state
                    workflow.status = WorkflowStatus::Completed;
                    workflow.completed_at = Some(now);
                } else {
                    workflow.current_step_number += 1;
                }
                is_last
            }
            Decision::Rejected { .. } => {
                workflow.status = WorkflowStatus::OnHold;
                false
            }
        };

        self.store.commit_transition(WorkflowTransition {
            workflow: workflow.clone(),
            step: Some(step.clone()),
        })?;

        match &decision {
            Decision::Approved { comments } => {
                self.record_audit(
                    AuditEntry::new(AuditAction::StepCompleted, user_id)
                        .with_workflow(workflow.id)
                        .with_document(workflow.document_id)
                        .with_details(serde_json::json!({
                            "step_number": step.step_number,
                            "step_name": step.name,
                            "comments": comments,
                        })),
                );
                log_event(
                    Event::WorkflowStepCompleted,
                    &[
                        ("workflow_id", &workflow.id.to_string()),
                        ("step_number", &step.step_number.to_string()),
                    ],
                );

                if completed_workflow {
                    self.record_audit(
                        AuditEntry::new(AuditAction::WorkflowCompleted, user_id)
                            .with_workflow(workflow.id)
                            .with_document(workflow.document_id)
                            .with_details(serde_json::json!({
                                "total_steps": total_steps,
                            })),
                    );
                    log_event(
                        Event::WorkflowCompleted,
                        &[
                            ("workflow_id", &workflow.id.to_string()),
                            ("document_id", &workflow.document_id.to_string()),
                        ],
                    );
                    self.send_notification(Notification::WorkflowCompleted {
                        workflow_id: workflow.id,
                        document_id: workflow.document_id,
                        workflow_name: workflow.name.clone(),
                    });
                }
            }
            Decision::Rejected {
                comments,
                revision_notes,
            } => {
                self.record_audit(
                    AuditEntry::new(AuditAction::StepRejected, user_id)
                        .with_workflow(workflow.id)
                        .with_document(workflow.document_id)
                        .with_details(serde_json::json!({
                            "step_number": step.step_number,
                            "step_name": step.name,
                            "comments": comments,
                            "revision_notes": revision_notes,
                        })),
                );
                log_event(
                    Event::WorkflowStepRejected,
                    &[
                        ("workflow_id", &workflow.id.to_string()),
                        ("step_number", &step.step_number.to_string()),
                    ],
                );
                self.send_notification(Notification::StepRejected {
                    workflow_id: workflow.id,
                    document_id: workflow.document_id,
                    step_number: step.step_number,
                    revision_notes: revision_notes.clone(),
                });
            }
        }

        Ok(StepOutcome { workflow, step })
    }

    /// Progress summary: completed / total, the current step, status.
    pub fn get_workflow_progress(&self, workflow_id: Uuid) -> WorkflowResult<WorkflowProgress> {
        let workflow = self.require_workflow(workflow_id)?;
        let steps = self.store.steps_for_workflow(workflow_id)?;

        let total_steps = steps.len() as u32;
        let completed_steps = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count() as u32;
        let progress = if total_steps == 0 {
            0.0
        } else {
            f64::from(completed_steps) / f64::from(total_steps)
        };

        Ok(WorkflowProgress {
            status: workflow.status,
            total_steps,
            completed_steps,
            current_step_number: workflow.current_step_number,
            progress,
        })
    }

    /// True while a blocking (Active or OnHold) workflow exists for the
    /// document.
    pub fn is_document_locked(&self, document_id: Uuid) -> WorkflowResult<bool> {
        Ok(self.store.blocking_workflow(document_id)?.is_some())
    }

    /// The lock gate consumed by the version store: lock status first,
    /// then the access-control collaborator.
    pub fn can_modify_document(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> WorkflowResult<ModifyDecision> {
        if let Some(workflow) = self.store.blocking_workflow(document_id)? {
            return Ok(ModifyDecision::denied(format!(
                "document is locked by workflow {} ({})",
                workflow.id,
                workflow.status.as_str()
            )));
        }

        if !self
            .access
            .check_permission(user_id, document_id, Permission::Write)
        {
            return Ok(ModifyDecision::denied(format!(
                "user {user_id} lacks WRITE permission"
            )));
        }

        Ok(ModifyDecision::allowed())
    }

    /// The chronological audit trail for a workflow.
    pub fn get_audit_trail(&self, workflow_id: Uuid) -> WorkflowResult<Vec<AuditEntry>> {
        self.require_workflow(workflow_id)?;
        Ok(self.store.audit_trail(workflow_id)?)
    }

    /// Full report: workflow row, ordered steps, trail, statistics.
    pub fn generate_report(&self, workflow_id: Uuid) -> WorkflowResult<WorkflowReport> {
        let workflow = self.require_workflow(workflow_id)?;
        let steps = self.store.steps_for_workflow(workflow_id)?;
        let audit_trail = self.store.audit_trail(workflow_id)?;

        let total_steps = steps.len() as u32;
        let completed_steps = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count() as u32;
        let rejected_steps = steps
            .iter()
            .filter(|s| s.status == StepStatus::Rejected)
            .count() as u32;
        let pending_steps = total_steps - completed_steps - rejected_steps;
        let progress = if total_steps == 0 {
            0.0
        } else {
            f64::from(completed_steps) / f64::from(total_steps)
        };

        Ok(WorkflowReport {
            workflow,
            steps,
            audit_trail,
            statistics: WorkflowStatistics {
                total_steps,
                completed_steps,
                rejected_steps,
                pending_steps,
                progress,
            },
        })
    }

    /// Fetch a workflow row.
    pub fn get_workflow(&self, workflow_id: Uuid) -> WorkflowResult<Workflow> {
        self.require_workflow(workflow_id)
    }

    fn require_workflow(&self, workflow_id: Uuid) -> WorkflowResult<Workflow> {
        self.store
            .workflow(workflow_id)?
            .ok_or(WorkflowError::WorkflowNotFound(workflow_id))
    }

    fn check_manage_permission(&self, user_id: Uuid, document_id: Uuid) -> WorkflowResult<()> {
        if !self
            .access
            .check_permission(user_id, document_id, Permission::ManageWorkflow)
        {
            return Err(WorkflowError::AccessDenied(format!(
                "user {user_id} lacks MANAGE_WORKFLOW permission on document {document_id}"
            )));
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

    /// Notification failures never fail the primary operation.
    fn send_notification(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification) {
            log_event(Event::NotifyFailed, &[("error", &e.to_string())]);
        }
    }
}

impl LockGate for WorkflowEngine {
    fn lock_state(&self, document_id: Uuid) -> Result<LockState, PersistenceError> {
        Ok(match self.store.blocking_workflow(document_id)? {
            Some(workflow) => LockState::locked_by(workflow.id),
            None => LockState::unlocked(),
        })
    }
}
