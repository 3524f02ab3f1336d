//! In-memory blob store for tests

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use super::{BlobError, BlobResult, BlobStore};

/// In-memory implementation of [`BlobStore`].
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Corrupt a stored blob in place. Test hook for integrity checks.
    #[doc(hidden)]
    pub fn corrupt(&self, handle: &str) -> BlobResult<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobError::Io("blob lock poisoned".to_string()))?;
        let data = blobs
            .get_mut(handle)
            .ok_or_else(|| BlobError::NotFound(handle.to_string()))?;
        if data.is_empty() {
            data.push(0xFF);
        } else {
            data[0] ^= 0xFF;
        }
        Ok(())
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, data: &[u8]) -> BlobResult<String> {
        let handle = Uuid::new_v4().to_string();
        self.blobs
            .write()
            .map_err(|_| BlobError::Io("blob lock poisoned".to_string()))?
            .insert(handle.clone(), data.to_vec());
        Ok(handle)
    }

    fn get(&self, handle: &str) -> BlobResult<Vec<u8>> {
        self.blobs
            .read()
            .map_err(|_| BlobError::Io("blob lock poisoned".to_string()))?
            .get(handle)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(handle.to_string()))
    }

    fn contains(&self, handle: &str) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(handle))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_round_trip() {
        let store = InMemoryBlobStore::new();
        let handle = store.put(b"ciphertext bytes").unwrap();

        assert!(store.contains(&handle));
        assert_eq!(store.get(&handle).unwrap(), b"ciphertext bytes");
    }

    #[test]
    fn test_missing_handle() {
        let store = InMemoryBlobStore::new();
        assert!(!store.contains("nope"));
        assert!(matches!(store.get("nope"), Err(BlobError::NotFound(_))));
    }

    #[test]
    fn test_handles_are_unique() {
        let store = InMemoryBlobStore::new();
        let a = store.put(b"same").unwrap();
        let b = store.put(b"same").unwrap();
        assert_ne!(a, b);
    }
}
