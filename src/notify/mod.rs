//! Notification collaborator
//!
//! Workflow completion and rejection fan out to interested parties
//! through this contract. Delivery is out of scope: failures are
//! surfaced as WARN logs by callers and never fail the workflow
//! transition.

use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

/// Result type for notification delivery.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Notification delivery errors. Never fatal.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound workflow notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// All steps approved; the document is unlocked.
    WorkflowCompleted {
        workflow_id: Uuid,
        document_id: Uuid,
        workflow_name: String,
    },
    /// A step was rejected; the workflow is parked OnHold.
    StepRejected {
        workflow_id: Uuid,
        document_id: Uuid,
        step_number: u32,
        revision_notes: Option<String>,
    },
}

/// Delivery contract.
pub trait Notifier: Send + Sync {
    /// Deliver a notification.
    fn notify(&self, notification: &Notification) -> NotifyResult<()>;
}

/// Discards all notifications.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    /// Create the discarding notifier.
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> NotifyResult<()> {
        Ok(())
    }
}

/// Records notifications for tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All delivered notifications, in order.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &Notification) -> NotifyResult<()> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Delivery("notifier lock poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        let notification = Notification::WorkflowCompleted {
            workflow_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            workflow_name: "Partner review".to_string(),
        };

        notifier.notify(&notification).unwrap();
        assert_eq!(notifier.sent(), vec![notification]);
    }

    #[test]
    fn test_noop_notifier_accepts_everything() {
        let notifier = NoopNotifier::new();
        assert!(notifier
            .notify(&Notification::StepRejected {
                workflow_id: Uuid::new_v4(),
                document_id: Uuid::new_v4(),
                step_number: 1,
                revision_notes: None,
            })
            .is_ok());
    }
}
