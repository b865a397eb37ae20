//! Factory for creating the configured KeyService and KeyVault.

use std::sync::Arc;

use stratus_core::config::{BackendKind, KmsSettings};

use crate::local::LocalKeyService;
use crate::provider::KeyService;
use crate::vault::KeyVault;

/// Create a KeyService based on the configured backend.
///
/// - `aws`: AWS KMS, with explicit credentials when both keys are set,
///   otherwise the default credential chain (compile with the `aws` feature)
/// - `local`: in-process AES-GCM keyring seeded with `default_key_id`
pub async fn create_key_service(settings: &KmsSettings) -> anyhow::Result<Arc<dyn KeyService>> {
    match settings.backend {
        #[cfg(feature = "aws")]
        BackendKind::Aws => {
            let service = crate::aws_kms::AwsKmsService::with_options(kms_options(settings)).await?;
            Ok(Arc::new(service))
        }

        #[cfg(not(feature = "aws"))]
        BackendKind::Aws => {
            anyhow::bail!("aws feature not enabled. Recompile with --features aws")
        }

        BackendKind::Local => {
            let service = LocalKeyService::new();
            service.create_key(&settings.default_key_id)?;
            tracing::warn!("Using the local key service; keys live only in this process");
            Ok(Arc::new(service))
        }
    }
}

#[cfg(feature = "aws")]
fn kms_options(settings: &KmsSettings) -> crate::aws_kms::KmsOptions<'_> {
    crate::aws_kms::KmsOptions {
        region: settings.region.as_deref(),
        endpoint_url: settings.endpoint_url.as_deref(),
        access_key: settings.access_key.as_deref(),
        secret_key: settings.secret_key.as_deref(),
    }
}

/// Build a [`KeyVault`] from settings.
pub async fn create_key_vault(settings: &KmsSettings) -> anyhow::Result<KeyVault> {
    let service = create_key_service(settings).await?;
    Ok(KeyVault::new(service, &settings.default_key_id))
}
