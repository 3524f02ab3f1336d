//! lexvault - a strict, auditable document versioning and workflow
//! engine for legal case management
//!
//! Two tightly coupled cores:
//! - **Versioning**: every content mutation flows through
//!   [`versioning::VersionStore`], which guarantees exactly one current
//!   version per document, gap-free version numbers, and immutable
//!   history. [`restore::RestoreEngine`] materializes historical
//!   content as new versions; [`integrity::IntegrityValidator`] detects
//!   silent corruption.
//! - **Workflow**: [`workflow::WorkflowEngine`] advances review and
//!   approval workflows through a closed state machine. Its only
//!   systemic effect is the document lock the version store consults
//!   before every write.
//!
//! Encryption, access control, persistence, audit, and notification are
//! injected collaborators; in-memory and local-filesystem reference
//! implementations ship with the crate.

pub mod access;
pub mod audit;
pub mod blobstore;
pub mod config;
pub mod crypto;
pub mod integrity;
pub mod notify;
pub mod observability;
pub mod persistence;
pub mod restore;
pub mod versioning;
pub mod workflow;

pub use access::{AccessControl, Permission};
pub use audit::{AuditAction, AuditEntry, AuditRecorder};
pub use config::VaultConfig;
pub use integrity::{IntegrityReport, IntegrityValidator};
pub use restore::{RestoreEngine, RestoreOptions};
pub use versioning::{Document, Version, VersionStore};
pub use workflow::{Decision, Workflow, WorkflowEngine, WorkflowStatus};
