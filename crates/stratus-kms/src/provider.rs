use async_trait::async_trait;

/// Trait for key-management backends.
///
/// A backend turns plaintext into an opaque ciphertext blob under a named
/// key, and back. The blob must identify its key, so `decrypt` takes no
/// key id.
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Encrypt `plaintext` under the key `key_id` (an id, ARN or alias).
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Decrypt a blob produced by [`KeyService::encrypt`].
    async fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Backend name for display.
    fn name(&self) -> &str;
}
