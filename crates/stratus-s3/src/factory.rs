//! Factory for creating the configured ObjectStore and facade.

use std::sync::Arc;

use stratus_core::config::{BackendKind, S3Settings};

use crate::facade::ObjectStoreFacade;
use crate::local::LocalObjectStore;
use crate::provider::ObjectStore;

/// Create an ObjectStore based on the configured backend.
///
/// - `aws`: AWS S3, or any S3-compatible server when `endpoint_url` is set
/// - `local`: filesystem store under `local_root`
pub async fn create_object_store(settings: &S3Settings) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match settings.backend {
        #[cfg(feature = "aws")]
        BackendKind::Aws => {
            let store = crate::s3::S3ObjectStore::with_options(crate::s3::S3Options {
                region: settings.region.as_deref(),
                name: "s3",
                endpoint_url: settings.endpoint_url.as_deref(),
                path_style: settings.path_style(),
                access_key: settings.access_key.as_deref(),
                secret_key: settings.secret_key.as_deref(),
            })
            .await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "aws"))]
        BackendKind::Aws => {
            anyhow::bail!("aws feature not enabled. Recompile with --features aws")
        }

        BackendKind::Local => {
            let root = settings
                .local_root
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("local_root required for the local object store"))?;
            let store = LocalObjectStore::new(root, "local")?.with_page_size(settings.page_size());
            Ok(Arc::new(store))
        }
    }
}

/// Build an [`ObjectStoreFacade`] from settings.
pub async fn create_object_store_facade(settings: &S3Settings) -> anyhow::Result<ObjectStoreFacade> {
    Ok(ObjectStoreFacade::new(create_object_store(settings).await?))
}
