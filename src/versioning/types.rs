//! Document and Version domain types
//!
//! A Version is a logically immutable record of a document's content at
//! a point in history:
//! - Has a complete encrypted payload in the blob store
//! - Has a strictly increasing, gap-free version number per document
//! - Once created, never changes
//!
//! Updates and restores create new versions only. Exactly one version
//! per live document carries `is_current = true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A case-owned legal document.
///
/// The document row holds identity and the current-version pointer.
/// Content lives in versions; the row is mutated only through the
/// version store's atomic commit path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// The case this document belongs to.
    pub case_id: Uuid,
    /// Human-readable title.
    pub title: String,
    /// The single authoritative version for reads.
    pub current_version_id: Uuid,
    /// Soft-delete flag. Versions are retained after deletion.
    pub is_deleted: bool,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Registering user.
    pub created_by: Uuid,
}

/// Encryption metadata returned by the encryption collaborator and
/// stored alongside each version.
///
/// All fields are base64-encoded opaque values. The versioning core
/// never inspects them beyond checking they are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    /// Identifier of the key that encrypted the payload.
    pub key_id: String,
    /// Initialization vector.
    pub iv: String,
    /// Authentication tag over the ciphertext.
    pub auth_tag: String,
}

impl EncryptionMetadata {
    /// Returns true if every field is populated.
    pub fn is_complete(&self) -> bool {
        !self.key_id.is_empty() && !self.iv.is_empty() && !self.auth_tag.is_empty()
    }
}

/// A single immutable document version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Unique version ID.
    pub id: Uuid,
    /// The document this version belongs to.
    pub document_id: Uuid,
    /// Positive, strictly increasing per document, no gaps.
    pub version_number: u64,
    /// Plaintext content size in bytes.
    pub size: u64,
    /// SHA-256 hex digest of the plaintext content.
    pub checksum: String,
    /// Opaque handle into the encrypted blob store.
    pub storage_path: String,
    /// Encryption metadata for the stored payload.
    pub encryption: EncryptionMetadata,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Creating user.
    pub created_by: Uuid,
    /// Optional author-supplied description of the change.
    pub change_description: Option<String>,
    /// True for exactly one version per live document.
    pub is_current: bool,
}

/// Caller context for version-creating operations.
#[derive(Debug, Clone)]
pub struct VersionContext {
    /// The acting user.
    pub user_id: Uuid,
    /// Optional description recorded on the new version.
    pub change_description: Option<String>,
}

impl VersionContext {
    /// Context with no change description.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            change_description: None,
        }
    }

    /// Attach a change description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.change_description = Some(description.into());
        self
    }
}

/// Sort order for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Most recent first. The default for history listings.
    #[default]
    Descending,
}

/// Parameters for a version-history query.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// The requesting user.
    pub user_id: Uuid,
    /// Sort order, most recent first by default.
    pub sort_order: SortOrder,
    /// Page size. `None` uses the configured default page size.
    pub limit: Option<usize>,
    /// Number of versions to skip.
    pub offset: usize,
}

impl HistoryQuery {
    /// Default query: most recent first, first page.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            sort_order: SortOrder::default(),
            limit: None,
            offset: 0,
        }
    }
}

/// One page of version history.
#[derive(Debug, Clone)]
pub struct VersionHistory {
    /// Versions in the requested order.
    pub versions: Vec<Version>,
    /// True if more versions exist beyond this page.
    pub has_more: bool,
}
