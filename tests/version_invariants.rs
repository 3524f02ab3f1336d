//! Versioning Invariant Tests
//!
//! - V1: Exactly one current version per live document at all times
//! - V2: Version numbers are gap-free: after N successful creations the
//!       set of numbers is exactly {1, .., N}
//! - V3: Content round-trips byte-for-byte through encrypt/store/decrypt
//! - V4: Identical content never produces a new version
//! - V5: Concurrent writers never duplicate numbers or current flags

use std::sync::Arc;

use lexvault::access::AllowAllAccess;
use lexvault::audit::StoreAuditRecorder;
use lexvault::blobstore::InMemoryBlobStore;
use lexvault::config::VaultConfig;
use lexvault::crypto::DevCipher;
use lexvault::persistence::{InMemoryPersistence, PersistenceError};
use lexvault::versioning::{
    HistoryQuery, NoLocks, SortOrder, Version, VersionContext, VersionError, VersionStore,
};
use uuid::Uuid;

// =============================================================================
// Test Utilities
// =============================================================================

fn version_store() -> Arc<VersionStore> {
    let store: Arc<InMemoryPersistence> = Arc::new(InMemoryPersistence::new());
    Arc::new(VersionStore::new(
        VaultConfig::default(),
        store.clone(),
        Arc::new(DevCipher::new()),
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(AllowAllAccess::new()),
        Arc::new(StoreAuditRecorder::new(store)),
        Arc::new(NoLocks),
    ))
}

fn full_history(versions: &VersionStore, document_id: Uuid, user_id: Uuid) -> Vec<Version> {
    versions
        .get_version_history(
            document_id,
            &HistoryQuery {
                user_id,
                sort_order: SortOrder::Ascending,
                limit: Some(100),
                offset: 0,
            },
        )
        .unwrap()
        .versions
}

// =============================================================================
// INVARIANT V1: Exactly One Current Version
// =============================================================================

/// V1: After any number of creations, exactly one version is current.
#[test]
fn test_v1_single_current_after_many_creations() {
    let versions = version_store();
    let ctx = VersionContext::new(Uuid::new_v4());

    let (document, _) = versions
        .register_document(Uuid::new_v4(), "Lease agreement", b"draft 1", &ctx)
        .unwrap();

    for i in 2..=10 {
        versions
            .create_version(document.id, format!("draft {i}").as_bytes(), &ctx)
            .unwrap();

        let history = full_history(&versions, document.id, ctx.user_id);
        let current: Vec<_> = history.iter().filter(|v| v.is_current).collect();
        assert_eq!(
            current.len(),
            1,
            "V1 VIOLATION: {} current versions after {} creations",
            current.len(),
            i
        );
        assert_eq!(current[0].version_number, i);
    }
}

/// V1: The document's current pointer always names the current version.
#[test]
fn test_v1_pointer_matches_current_flag() {
    let versions = version_store();
    let ctx = VersionContext::new(Uuid::new_v4());

    let (document, _) = versions
        .register_document(Uuid::new_v4(), "Engagement letter", b"one", &ctx)
        .unwrap();
    versions.create_version(document.id, b"two", &ctx).unwrap();
    let v3 = versions.create_version(document.id, b"three", &ctx).unwrap();

    let document = versions.get_document(document.id, ctx.user_id).unwrap();
    assert_eq!(document.current_version_id, v3.id);

    let fetched = versions.get_version(v3.id, ctx.user_id).unwrap();
    assert!(fetched.is_current);
}

// =============================================================================
// INVARIANT V2: Gap-Free Version Numbers
// =============================================================================

/// V2: N successful creations yield numbers exactly {1, .., N}.
#[test]
fn test_v2_numbers_are_contiguous() {
    let versions = version_store();
    let ctx = VersionContext::new(Uuid::new_v4());

    let (document, _) = versions
        .register_document(Uuid::new_v4(), "Motion to dismiss", b"v1", &ctx)
        .unwrap();
    for i in 2..=7 {
        versions
            .create_version(document.id, format!("v{i}").as_bytes(), &ctx)
            .unwrap();
    }

    let mut numbers: Vec<u64> = full_history(&versions, document.id, ctx.user_id)
        .iter()
        .map(|v| v.version_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=7).collect::<Vec<u64>>());
}

/// V2: A failed creation leaves no gap behind.
#[test]
fn test_v2_failed_creation_leaves_no_gap() {
    let versions = version_store();
    let ctx = VersionContext::new(Uuid::new_v4());

    let (document, _) = versions
        .register_document(Uuid::new_v4(), "Settlement", b"v1", &ctx)
        .unwrap();
    versions.create_version(document.id, b"v2", &ctx).unwrap();

    // Duplicate content fails without writing a row
    assert!(matches!(
        versions.create_version(document.id, b"v2", &ctx),
        Err(VersionError::NoChangesDetected)
    ));

    let v3 = versions.create_version(document.id, b"v3", &ctx).unwrap();
    assert_eq!(v3.version_number, 3);

    let numbers: Vec<u64> = full_history(&versions, document.id, ctx.user_id)
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

// =============================================================================
// INVARIANT V3: Content Round-Trip
// =============================================================================

/// V3: Retrieved content equals what was stored, byte for byte.
#[test]
fn test_v3_round_trip() {
    let versions = version_store();
    let ctx = VersionContext::new(Uuid::new_v4());

    let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let (document, v1) = versions
        .register_document(Uuid::new_v4(), "Scanned exhibit", &binary, &ctx)
        .unwrap();

    let retrieved = versions.get_version_content(v1.id, ctx.user_id).unwrap();
    assert_eq!(retrieved, binary);

    // Historical versions keep round-tripping after newer writes
    versions
        .create_version(document.id, b"replacement text", &ctx)
        .unwrap();
    let retrieved = versions.get_version_content(v1.id, ctx.user_id).unwrap();
    assert_eq!(retrieved, binary);
}

/// V3: Ciphertext stored in the blob layer differs from the plaintext.
#[test]
fn test_v3_content_is_encrypted_at_rest() {
    let store: Arc<InMemoryPersistence> = Arc::new(InMemoryPersistence::new());
    let blobs: Arc<InMemoryBlobStore> = Arc::new(InMemoryBlobStore::new());
    let versions = VersionStore::new(
        VaultConfig::default(),
        store.clone(),
        Arc::new(DevCipher::new()),
        blobs.clone(),
        Arc::new(AllowAllAccess::new()),
        Arc::new(StoreAuditRecorder::new(store)),
        Arc::new(NoLocks),
    );

    let ctx = VersionContext::new(Uuid::new_v4());
    let plaintext = b"privileged and confidential attorney work product";
    let (_, v1) = versions
        .register_document(Uuid::new_v4(), "Memo", plaintext, &ctx)
        .unwrap();

    use lexvault::blobstore::BlobStore;
    let stored = blobs.get(&v1.storage_path).unwrap();
    assert_ne!(stored, plaintext.to_vec());
}

// =============================================================================
// INVARIANT V4: Idempotence Guard
// =============================================================================

/// V4: Identical content twice - second call fails, no extra row.
#[test]
fn test_v4_duplicate_content_rejected() {
    let versions = version_store();
    let ctx = VersionContext::new(Uuid::new_v4());

    let (document, _) = versions
        .register_document(Uuid::new_v4(), "NDA", b"mutual nda v1", &ctx)
        .unwrap();

    let first = versions.create_version(document.id, b"mutual nda v2", &ctx);
    assert!(first.is_ok());

    let second = versions.create_version(document.id, b"mutual nda v2", &ctx);
    assert!(matches!(second, Err(VersionError::NoChangesDetected)));

    assert_eq!(full_history(&versions, document.id, ctx.user_id).len(), 2);
}

// =============================================================================
// INVARIANT V5: Concurrent Writers
// =============================================================================

/// V5: Concurrent creations never duplicate numbers or current flags.
/// Lost races surface as conflicts and are retried.
#[test]
fn test_v5_concurrent_creations_stay_consistent() {
    let versions = version_store();
    let ctx = VersionContext::new(Uuid::new_v4());

    let (document, _) = versions
        .register_document(Uuid::new_v4(), "Shared draft", b"base", &ctx)
        .unwrap();
    let document_id = document.id;

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let versions = versions.clone();
            std::thread::spawn(move || {
                let ctx = VersionContext::new(Uuid::new_v4());
                let content = format!("writer {i} contribution");
                loop {
                    match versions.create_version(document_id, content.as_bytes(), &ctx) {
                        Ok(_) => break,
                        Err(VersionError::Persistence(
                            PersistenceError::CurrentVersionConflict { .. },
                        )) => continue,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }

    let history = full_history(&versions, document_id, ctx.user_id);
    assert_eq!(history.len(), 9);

    let mut numbers: Vec<u64> = history.iter().map(|v| v.version_number).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=9).collect::<Vec<u64>>());

    let current_count = history.iter().filter(|v| v.is_current).count();
    assert_eq!(current_count, 1, "V5 VIOLATION: {current_count} current versions");
}
