//! String and mapping encryption through a [`KeyService`].
//!
//! Ciphertext blobs are carried as standard padded base64 so they can be
//! stored in config files, environment variables or JSON.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use stratus_core::Result;

use crate::provider::KeyService;

/// Encrypts and decrypts text values under a managed key.
#[derive(Clone)]
pub struct KeyVault {
    service: Arc<dyn KeyService>,
    default_key_id: String,
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("service", &self.service.name())
            .field("default_key_id", &self.default_key_id)
            .finish()
    }
}

impl KeyVault {
    pub fn new(service: Arc<dyn KeyService>, default_key_id: &str) -> Self {
        Self {
            service,
            default_key_id: default_key_id.to_string(),
        }
    }

    pub fn default_key_id(&self) -> &str {
        &self.default_key_id
    }

    /// Encrypt under the default key and return base64 ciphertext.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.encrypt_with_key(plaintext, &self.default_key_id).await
    }

    /// Encrypt under `key_id` (an id, ARN or alias) and return base64 ciphertext.
    pub async fn encrypt_with_key(&self, plaintext: &str, key_id: &str) -> Result<String> {
        let blob = self.service.encrypt(key_id, plaintext.as_bytes()).await?;
        Ok(STANDARD.encode(blob))
    }

    /// Decrypt a base64 value produced by [`KeyVault::encrypt`].
    pub async fn decrypt(&self, encoded: &str) -> Result<String> {
        let blob = STANDARD.decode(encoded)?;
        let plaintext = self.service.decrypt(&blob).await?;
        Ok(String::from_utf8(plaintext)?)
    }

    /// Encrypt every value of `mapping` under the default key. Keys are kept as-is.
    pub async fn encrypt_mapping(
        &self,
        mapping: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        self.encrypt_mapping_with_key(mapping, &self.default_key_id)
            .await
    }

    /// Encrypt every value of `mapping` under `key_id`, one request per value.
    ///
    /// The first failure aborts the whole call.
    pub async fn encrypt_mapping_with_key(
        &self,
        mapping: &HashMap<String, String>,
        key_id: &str,
    ) -> Result<HashMap<String, String>> {
        let mut encrypted = HashMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            encrypted.insert(key.clone(), self.encrypt_with_key(value, key_id).await?);
        }
        tracing::debug!(key_id, entries = encrypted.len(), "Encrypted mapping");
        Ok(encrypted)
    }

    /// Decrypt every value of `mapping`, one request per value.
    ///
    /// The first failure aborts the whole call.
    pub async fn decrypt_mapping(
        &self,
        mapping: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        let mut decrypted = HashMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            decrypted.insert(key.clone(), self.decrypt(value).await?);
        }
        tracing::debug!(entries = decrypted.len(), "Decrypted mapping");
        Ok(decrypted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalKeyService;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use stratus_core::StratusError;

    fn local_vault() -> KeyVault {
        let service = LocalKeyService::new();
        service.create_key("alias/app").unwrap();
        service.create_key("alias/other").unwrap();
        KeyVault::new(Arc::new(service), "alias/app")
    }

    /// Reverses bytes, fails on a poisoned plaintext, counts calls.
    #[derive(Default)]
    struct ScriptedService {
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KeyService for ScriptedService {
        async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
            self.calls.lock().unwrap().push(format!("encrypt:{key_id}"));
            if plaintext == b"poison" {
                anyhow::bail!("AccessDeniedException: not authorized to use {key_id}");
            }
            Ok(plaintext.iter().rev().copied().collect())
        }

        async fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>> {
            self.calls.lock().unwrap().push("decrypt".to_string());
            Ok(ciphertext.iter().rev().copied().collect())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn string_roundtrip() {
        let vault = local_vault();
        let long = "x".repeat(4096);
        for plaintext in ["", "hello", "ünïcödé ✓", long.as_str()] {
            let encrypted = vault.encrypt(plaintext).await.unwrap();
            assert_ne!(encrypted, plaintext);
            assert_eq!(vault.decrypt(&encrypted).await.unwrap(), plaintext);
        }
    }

    #[tokio::test]
    async fn explicit_key_roundtrip() {
        let vault = local_vault();
        let encrypted = vault.encrypt_with_key("s3cret", "alias/other").await.unwrap();
        assert_eq!(vault.decrypt(&encrypted).await.unwrap(), "s3cret");
    }

    #[tokio::test]
    async fn ciphertext_is_base64() {
        let vault = local_vault();
        let encrypted = vault.encrypt("value").await.unwrap();
        assert!(STANDARD.decode(&encrypted).is_ok());
    }

    #[tokio::test]
    async fn mapping_roundtrip_preserves_keys() {
        let vault = local_vault();
        let mapping: HashMap<String, String> = [
            ("DB_PASSWORD", "hunter2"),
            ("API_TOKEN", "tok_live_123"),
            ("EMPTY", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let encrypted = vault.encrypt_mapping(&mapping).await.unwrap();
        let encrypted_keys: BTreeSet<&String> = encrypted.keys().collect();
        let original_keys: BTreeSet<&String> = mapping.keys().collect();
        assert_eq!(encrypted_keys, original_keys);
        assert_ne!(encrypted["DB_PASSWORD"], "hunter2");

        let decrypted = vault.decrypt_mapping(&encrypted).await.unwrap();
        assert_eq!(decrypted, mapping);
    }

    #[tokio::test]
    async fn malformed_base64_fails_before_remote_call() {
        let service = Arc::new(ScriptedService::default());
        let vault = KeyVault::new(service.clone(), "alias/app");

        let err = vault.decrypt("not base64!!").await.unwrap_err();
        assert!(matches!(err, StratusError::Encoding(_)));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn non_utf8_plaintext_fails() {
        let service = Arc::new(ScriptedService::default());
        let vault = KeyVault::new(service, "alias/app");

        let encoded = STANDARD.encode([0xff, 0xfe]);
        let err = vault.decrypt(&encoded).await.unwrap_err();
        assert!(matches!(err, StratusError::Utf8(_)));
    }

    #[tokio::test]
    async fn remote_failure_propagates() {
        let service = Arc::new(ScriptedService::default());
        let vault = KeyVault::new(service, "alias/app");

        let err = vault.encrypt("poison").await.unwrap_err();
        assert!(matches!(err, StratusError::Remote(_)));
        assert!(err.to_string().contains("AccessDeniedException"));
    }

    #[tokio::test]
    async fn mapping_aborts_on_first_failure() {
        let service = Arc::new(ScriptedService::default());
        let vault = KeyVault::new(service.clone(), "alias/app");

        let mapping: HashMap<String, String> = [("a", "fine"), ("b", "poison"), ("c", "fine")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let result = vault.encrypt_mapping_with_key(&mapping, "alias/x").await;
        assert!(matches!(result, Err(StratusError::Remote(_))));

        // Sequential: nothing is issued after the failing value.
        let calls = service.calls();
        assert!(!calls.is_empty() && calls.len() <= mapping.len());
        assert!(calls.iter().all(|c| c == "encrypt:alias/x"));
    }

    #[tokio::test]
    async fn one_request_per_value() {
        let service = Arc::new(ScriptedService::default());
        let vault = KeyVault::new(service.clone(), "alias/app");

        let mapping: HashMap<String, String> = (0..5)
            .map(|i| (format!("k{i}"), format!("v{i}")))
            .collect();

        let encrypted = vault.encrypt_mapping(&mapping).await.unwrap();
        let decrypted = vault.decrypt_mapping(&encrypted).await.unwrap();
        assert_eq!(decrypted, mapping);
        assert_eq!(service.calls().len(), 10);
    }
}
