use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::provider::KeyService;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum LocalKeyError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Key id must be 1..=255 bytes, got {0}")]
    InvalidKeyId(usize),

    #[error("Malformed ciphertext blob")]
    MalformedBlob,

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed: ciphertext is invalid or was tampered with")]
    Decryption,

    #[error("Keyring lock poisoned")]
    Poisoned,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyMaterial([u8; 32]);

/// In-process AES-256-GCM key service for development and tests.
///
/// Blob layout: `[id_len: u8][key id][nonce: 12][ciphertext + tag]`.
/// The key id doubles as associated data, so relabelling a blob with a
/// different id fails authentication.
#[derive(Default)]
pub struct LocalKeyService {
    keys: RwLock<HashMap<String, KeyMaterial>>,
}

impl fmt::Debug for LocalKeyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .keys
            .read()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("LocalKeyService")
            .field("key_ids", &ids)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

impl LocalKeyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh random key under `key_id`, replacing any existing one.
    pub fn create_key(&self, key_id: &str) -> Result<(), LocalKeyError> {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        self.import_key(key_id, key)
    }

    /// Install known key material under `key_id`.
    pub fn import_key(&self, key_id: &str, key: [u8; 32]) -> Result<(), LocalKeyError> {
        if key_id.is_empty() || key_id.len() > u8::MAX as usize {
            return Err(LocalKeyError::InvalidKeyId(key_id.len()));
        }
        let mut keys = self.keys.write().map_err(|_| LocalKeyError::Poisoned)?;
        keys.insert(key_id.to_string(), KeyMaterial(key));
        tracing::debug!(key_id, "Installed local key");
        Ok(())
    }

    pub fn key_ids(&self) -> Vec<String> {
        self.keys
            .read()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn cipher_for(&self, key_id: &str) -> Result<Aes256Gcm, LocalKeyError> {
        let keys = self.keys.read().map_err(|_| LocalKeyError::Poisoned)?;
        let key = keys
            .get(key_id)
            .ok_or_else(|| LocalKeyError::KeyNotFound(key_id.to_string()))?;
        Aes256Gcm::new_from_slice(&key.0).map_err(|_| LocalKeyError::Encryption)
    }

    fn seal(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, LocalKeyError> {
        if key_id.is_empty() || key_id.len() > u8::MAX as usize {
            return Err(LocalKeyError::InvalidKeyId(key_id.len()));
        }
        let cipher = self.cipher_for(key_id)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: key_id.as_bytes(),
                },
            )
            .map_err(|_| LocalKeyError::Encryption)?;

        let mut blob = Vec::with_capacity(1 + key_id.len() + NONCE_LEN + ciphertext.len());
        blob.push(key_id.len() as u8);
        blob.extend_from_slice(key_id.as_bytes());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn open(&self, blob: &[u8]) -> Result<Vec<u8>, LocalKeyError> {
        let (&id_len, rest) = blob.split_first().ok_or(LocalKeyError::MalformedBlob)?;
        let id_len = id_len as usize;
        if id_len == 0 || rest.len() < id_len + NONCE_LEN {
            return Err(LocalKeyError::MalformedBlob);
        }
        let (id_bytes, rest) = rest.split_at(id_len);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let key_id = std::str::from_utf8(id_bytes).map_err(|_| LocalKeyError::MalformedBlob)?;

        let cipher = self.cipher_for(key_id)?;
        cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: id_bytes,
                },
            )
            .map_err(|_| LocalKeyError::Decryption)
    }
}

#[async_trait]
impl KeyService for LocalKeyService {
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(self.seal(key_id, plaintext)?)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(self.open(ciphertext)?)
    }

    fn name(&self) -> &str {
        "local"
    }
}
