//! Versioning core
//!
//! Encodes the vault's vocabulary and invariants in types:
//! - `Document` / `Version` - domain rows; versions immutable once
//!   created
//! - `VersionStore` - the single write path: creation, numbering,
//!   current-pointer maintenance, history, content round-trip
//! - `LockGate` - the workflow-lock seam the store consults before
//!   every write
//! - checksums - SHA-256 digests for no-op detection and round-trip
//!   verification

mod checksum;
mod errors;
mod store;
mod types;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{VersionError, VersionResult};
pub use store::{LockGate, LockState, NoLocks, VersionStore};
pub use types::{
    Document, EncryptionMetadata, HistoryQuery, SortOrder, Version, VersionContext, VersionHistory,
};
