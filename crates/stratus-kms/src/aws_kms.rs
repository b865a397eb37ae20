//! AWS KMS KeyService implementation.
//!
//! Plaintext goes to `Encrypt` under the caller's key id and the returned
//! `CiphertextBlob` is handed back as-is. KMS embeds the key reference in
//! the blob, so `Decrypt` is called without a key id.

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_kms::Client;
use aws_sdk_kms::primitives::Blob;

use crate::provider::KeyService;

/// AWS KMS key service.
pub struct AwsKmsService {
    client: Client,
    name: String,
}

/// Options for creating a KMS client.
#[derive(Default)]
pub struct KmsOptions<'a> {
    pub region: Option<&'a str>,
    /// Custom endpoint URL (e.g. `http://localhost:4566` for LocalStack).
    pub endpoint_url: Option<&'a str>,
    /// Explicit access key. If None, uses env/profile credentials.
    pub access_key: Option<&'a str>,
    /// Explicit secret key. If None, uses env/profile credentials.
    pub secret_key: Option<&'a str>,
}

impl AwsKmsService {
    /// Create a service using the default credential chain
    /// (env vars, AWS CLI profile, IAM role, etc.).
    pub async fn new(region: Option<&str>) -> anyhow::Result<Self> {
        Self::with_options(KmsOptions {
            region,
            ..Default::default()
        })
        .await
    }

    /// Create with full options.
    pub async fn with_options(opts: KmsOptions<'_>) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::from_env();

        if let Some(r) = opts.region {
            config_loader = config_loader.region(aws_config::Region::new(r.to_string()));
        }

        if let (Some(ak), Some(sk)) = (opts.access_key, opts.secret_key) {
            let creds = aws_sdk_kms::config::Credentials::new(ak, sk, None, None, "stratus-config");
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let mut kms_config_builder = aws_sdk_kms::config::Builder::from(&sdk_config);
        if let Some(endpoint) = opts.endpoint_url {
            kms_config_builder = kms_config_builder.endpoint_url(endpoint);
        }

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "default".to_string());

        Ok(Self {
            client: Client::from_conf(kms_config_builder.build()),
            name: format!("aws-kms ({region})"),
        })
    }

    /// Wrap an already-configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            name: "aws-kms".to_string(),
        }
    }
}

#[async_trait]
impl KeyService for AwsKmsService {
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
        tracing::debug!(key_id, len = plaintext.len(), "KMS Encrypt");

        let resp = self
            .client
            .encrypt()
            .key_id(key_id)
            .plaintext(Blob::new(plaintext))
            .send()
            .await
            .with_context(|| format!("AWS KMS encrypt with key {key_id} failed"))?;

        let blob = resp
            .ciphertext_blob()
            .ok_or_else(|| anyhow::anyhow!("KMS encrypt response has no CiphertextBlob"))?;
        Ok(blob.as_ref().to_vec())
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>> {
        tracing::debug!(len = ciphertext.len(), "KMS Decrypt");

        let resp = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext))
            .send()
            .await
            .context("AWS KMS decrypt failed")?;

        let plaintext = resp
            .plaintext()
            .ok_or_else(|| anyhow::anyhow!("KMS decrypt response has no Plaintext"))?;
        Ok(plaintext.as_ref().to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
