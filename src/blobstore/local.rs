//! Local filesystem blob store
//!
//! One file per blob under the root directory, framed as a 4-byte
//! big-endian CRC32 followed by the payload. Every read validates the
//! checksum; any mismatch is an explicit failure, never silently
//! ignored.

use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

use super::{BlobError, BlobResult, BlobStore};

const CRC_LEN: usize = 4;

/// Filesystem implementation of [`BlobStore`].
#[derive(Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn blob_path(&self, handle: &str) -> PathBuf {
        self.root.join(handle)
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, data: &[u8]) -> BlobResult<String> {
        fs::create_dir_all(&self.root).map_err(|e| BlobError::Io(e.to_string()))?;

        let handle = Uuid::new_v4().to_string();
        let crc = crc32fast::hash(data);

        let mut framed = Vec::with_capacity(CRC_LEN + data.len());
        framed.extend_from_slice(&crc.to_be_bytes());
        framed.extend_from_slice(data);

        fs::write(self.blob_path(&handle), framed).map_err(|e| BlobError::Io(e.to_string()))?;
        Ok(handle)
    }

    fn get(&self, handle: &str) -> BlobResult<Vec<u8>> {
        let framed = fs::read(self.blob_path(handle)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(handle.to_string())
            } else {
                BlobError::Io(e.to_string())
            }
        })?;

        if framed.len() < CRC_LEN {
            return Err(BlobError::ChecksumMismatch(handle.to_string()));
        }

        let (header, data) = framed.split_at(CRC_LEN);
        let stored = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if crc32fast::hash(data) != stored {
            return Err(BlobError::ChecksumMismatch(handle.to_string()));
        }

        Ok(data.to_vec())
    }

    fn contains(&self, handle: &str) -> bool {
        self.blob_path(handle).is_file()
    }
}
