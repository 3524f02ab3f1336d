//! Access-control collaborator
//!
//! Permission evaluation is external to the versioning core: the core
//! only asks yes/no questions through [`AccessControl`]. Policy,
//! role resolution, and inheritance live behind the trait.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a caller wants to do with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Read metadata, history, and content.
    Read,
    /// Create new versions.
    Write,
    /// Soft-delete the document.
    Delete,
    /// Create and drive workflows.
    ManageWorkflow,
}

impl Permission {
    /// Returns the permission name string.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::Delete => "DELETE",
            Permission::ManageWorkflow => "MANAGE_WORKFLOW",
        }
    }
}

/// Permission check contract.
pub trait AccessControl: Send + Sync {
    /// True if the user holds the permission on the document.
    fn check_permission(&self, user_id: Uuid, document_id: Uuid, permission: Permission) -> bool;
}

/// Grants everything. For tests and trusted internal callers.
#[derive(Debug, Default)]
pub struct AllowAllAccess;

impl AllowAllAccess {
    /// Create the permissive checker.
    pub fn new() -> Self {
        Self
    }
}

impl AccessControl for AllowAllAccess {
    fn check_permission(&self, _user_id: Uuid, _document_id: Uuid, _permission: Permission) -> bool {
        true
    }
}

/// Explicit per-user, per-document grant table.
#[derive(Debug, Default)]
pub struct InMemoryAccessControl {
    grants: RwLock<HashMap<(Uuid, Uuid), HashSet<Permission>>>,
}

impl InMemoryAccessControl {
    /// Create an empty grant table. Everything is denied until granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a single permission.
    pub fn grant(&self, user_id: Uuid, document_id: Uuid, permission: Permission) {
        self.grants
            .write()
            .expect("grant lock poisoned")
            .entry((user_id, document_id))
            .or_default()
            .insert(permission);
    }

    /// Grant all permissions on a document.
    pub fn grant_all(&self, user_id: Uuid, document_id: Uuid) {
        for permission in [
            Permission::Read,
            Permission::Write,
            Permission::Delete,
            Permission::ManageWorkflow,
        ] {
            self.grant(user_id, document_id, permission);
        }
    }

    /// Revoke a single permission.
    pub fn revoke(&self, user_id: Uuid, document_id: Uuid, permission: Permission) {
        if let Some(set) = self
            .grants
            .write()
            .expect("grant lock poisoned")
            .get_mut(&(user_id, document_id))
        {
            set.remove(&permission);
        }
    }
}

impl AccessControl for InMemoryAccessControl {
    fn check_permission(&self, user_id: Uuid, document_id: Uuid, permission: Permission) -> bool {
        self.grants
            .read()
            .expect("grant lock poisoned")
            .get(&(user_id, document_id))
            .map(|set| set.contains(&permission))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let access = AllowAllAccess::new();
        assert!(access.check_permission(Uuid::new_v4(), Uuid::new_v4(), Permission::Delete));
    }

    #[test]
    fn test_default_deny() {
        let access = InMemoryAccessControl::new();
        assert!(!access.check_permission(Uuid::new_v4(), Uuid::new_v4(), Permission::Read));
    }

    #[test]
    fn test_grant_and_revoke() {
        let access = InMemoryAccessControl::new();
        let user = Uuid::new_v4();
        let document = Uuid::new_v4();

        access.grant(user, document, Permission::Write);
        assert!(access.check_permission(user, document, Permission::Write));
        assert!(!access.check_permission(user, document, Permission::Delete));

        access.revoke(user, document, Permission::Write);
        assert!(!access.check_permission(user, document, Permission::Write));
    }

    #[test]
    fn test_grants_are_per_document() {
        let access = InMemoryAccessControl::new();
        let user = Uuid::new_v4();
        let document = Uuid::new_v4();
        let other = Uuid::new_v4();

        access.grant_all(user, document);
        assert!(access.check_permission(user, document, Permission::ManageWorkflow));
        assert!(!access.check_permission(user, other, Permission::Read));
    }
}
