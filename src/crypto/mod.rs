//! Encryption collaborator
//!
//! The versioning core never implements cryptography itself: it hands
//! plaintext to an [`EncryptionProvider`] and stores the returned
//! ciphertext plus metadata (key id, IV, auth tag) opaquely.
//!
//! [`DevCipher`] is the bundled reference provider for tests and
//! self-hosted development. It is a SHA-256 keystream construction,
//! not AES-256; production deployments inject a KMS-backed provider.

mod dev;

pub use dev::DevCipher;

use thiserror::Error;

/// Result type for encryption operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Encryption collaborator errors.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    #[error("Unknown encryption key: {0}")]
    UnknownKey(String),

    #[error("Authentication tag mismatch")]
    AuthTagMismatch,

    #[error("Invalid encryption metadata: {0}")]
    InvalidMetadata(String),
}

/// An encrypted payload plus the metadata needed to decrypt it.
///
/// `iv` and `auth_tag` are base64-encoded; `key_id` names a key held by
/// the provider. None of the fields are inspected by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// The encrypted bytes.
    pub ciphertext: Vec<u8>,
    /// Identifier of the encrypting key.
    pub key_id: String,
    /// Base64-encoded initialization vector.
    pub iv: String,
    /// Base64-encoded authentication tag over the ciphertext.
    pub auth_tag: String,
}

/// Encrypt/decrypt contract.
///
/// `decrypt(encrypt(p))` must return exactly `p`, and decryption must
/// fail with [`CryptoError::AuthTagMismatch`] if the ciphertext was
/// altered.
pub trait EncryptionProvider: Send + Sync {
    /// Encrypt plaintext under the provider's active key.
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<EncryptedPayload>;

    /// Decrypt a payload produced by `encrypt`.
    fn decrypt(&self, payload: &EncryptedPayload) -> CryptoResult<Vec<u8>>;
}
