//! Development encryption provider
//!
//! SHA-256 keystream cipher with a random per-payload IV and a SHA-256
//! tag over the ciphertext. Deterministic given (key, iv), so the
//! round-trip invariant holds, and any ciphertext tampering fails the
//! tag check before decryption.
//!
//! Not AES-256. Suitable for tests and local development only.

use std::collections::HashMap;
use std::sync::RwLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::{CryptoError, CryptoResult, EncryptedPayload, EncryptionProvider};

const KEY_LEN: usize = 32;
const IV_LEN: usize = 12;

/// SHA-256 keystream provider with an in-memory keyring.
pub struct DevCipher {
    keys: RwLock<HashMap<String, [u8; KEY_LEN]>>,
    active_key_id: String,
}

impl DevCipher {
    /// Create a provider with one freshly generated active key.
    pub fn new() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);

        let key_id = format!("dev-{}", uuid::Uuid::new_v4());
        let mut keys = HashMap::new();
        keys.insert(key_id.clone(), key);

        Self {
            keys: RwLock::new(keys),
            active_key_id: key_id,
        }
    }

    /// The key id new payloads are encrypted under.
    pub fn active_key_id(&self) -> &str {
        &self.active_key_id
    }

    fn key(&self, key_id: &str) -> CryptoResult<[u8; KEY_LEN]> {
        self.keys
            .read()
            .map_err(|_| CryptoError::InvalidMetadata("keyring lock poisoned".to_string()))?
            .get(key_id)
            .copied()
            .ok_or_else(|| CryptoError::UnknownKey(key_id.to_string()))
    }

    /// XOR the input with a SHA-256 counter keystream.
    fn apply_keystream(key: &[u8; KEY_LEN], iv: &[u8], input: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(input.len());
        let mut counter: u64 = 0;

        for chunk in input.chunks(32) {
            let mut hasher = Sha256::new();
            hasher.update(key);
            hasher.update(iv);
            hasher.update(counter.to_le_bytes());
            let block = hasher.finalize();

            for (byte, pad) in chunk.iter().zip(block.iter()) {
                output.push(byte ^ pad);
            }
            counter += 1;
        }

        output
    }

    fn compute_tag(key: &[u8; KEY_LEN], iv: &[u8], ciphertext: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.update(iv);
        hasher.update(ciphertext);
        STANDARD.encode(hasher.finalize())
    }
}

impl Default for DevCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionProvider for DevCipher {
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<EncryptedPayload> {
        let key = self.key(&self.active_key_id)?;

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Self::apply_keystream(&key, &iv, plaintext);
        let auth_tag = Self::compute_tag(&key, &iv, &ciphertext);

        Ok(EncryptedPayload {
            ciphertext,
            key_id: self.active_key_id.clone(),
            iv: STANDARD.encode(iv),
            auth_tag,
        })
    }

    fn decrypt(&self, payload: &EncryptedPayload) -> CryptoResult<Vec<u8>> {
        let key = self.key(&payload.key_id)?;

        let iv = STANDARD
            .decode(&payload.iv)
            .map_err(|e| CryptoError::InvalidMetadata(format!("bad IV encoding: {e}")))?;

        let expected_tag = Self::compute_tag(&key, &iv, &payload.ciphertext);
        if expected_tag != payload.auth_tag {
            return Err(CryptoError::AuthTagMismatch);
        }

        Ok(Self::apply_keystream(&key, &iv, &payload.ciphertext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cipher = DevCipher::new();
        let plaintext = b"CONFIDENTIAL: settlement offer $1.2M";

        let payload = cipher.encrypt(plaintext).unwrap();
        assert_ne!(payload.ciphertext, plaintext.to_vec());

        let decrypted = cipher.decrypt(&payload).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let cipher = DevCipher::new();
        let payload = cipher.encrypt(b"").unwrap();
        assert!(cipher.decrypt(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let cipher = DevCipher::new();
        let a = cipher.encrypt(b"same content").unwrap();
        let b = cipher.encrypt(b"same content").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_tampered_ciphertext_fails_tag_check() {
        let cipher = DevCipher::new();
        let mut payload = cipher.encrypt(b"original terms").unwrap();
        payload.ciphertext[0] ^= 0xFF;

        assert!(matches!(
            cipher.decrypt(&payload),
            Err(CryptoError::AuthTagMismatch)
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let cipher = DevCipher::new();
        let other = DevCipher::new();

        let payload = other.encrypt(b"foreign payload").unwrap();
        assert!(matches!(
            cipher.decrypt(&payload),
            Err(CryptoError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_metadata_populated() {
        let cipher = DevCipher::new();
        let payload = cipher.encrypt(b"x").unwrap();
        assert!(!payload.key_id.is_empty());
        assert!(!payload.iv.is_empty());
        assert!(!payload.auth_tag.is_empty());
    }
}
