//! Restoration and rollback
//!
//! Point-in-time restoration without losing history: a restore reads a
//! historical version's content and materializes it as a brand-new
//! current version through the version store's ordinary creation path.
//! Rollback is the same operation addressed by version number.

mod engine;
mod errors;

pub use engine::{
    RestoreEngine, RestoreOptions, RestoreOutcome, RollbackOutcome, RollbackSummary,
};
pub use errors::{RestoreError, RestoreResult};
