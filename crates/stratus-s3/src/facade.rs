//! URI-level object operations over an [`ObjectStore`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stratus_core::{IntoStorageUri, Result, StratusError};

use crate::provider::ObjectStore;
use crate::types::{AclAck, CannedAcl, ObjectAcl, ObjectEntry};

/// Resolves storage URIs and runs object operations against one store.
#[derive(Clone)]
pub struct ObjectStoreFacade {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ObjectStoreFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreFacade")
            .field("store", &self.store.name())
            .finish()
    }
}

/// Local path for `bucket/key` under `dest_dir`: `dest_dir/bucket/<key segments>`.
///
/// The bucket must be a single path component. Empty key segments are
/// skipped. `.`, `..` and backslashes are rejected so the result always
/// stays under `dest_dir/bucket`.
pub fn local_destination(dest_dir: &Path, bucket: &str, key: &str) -> Result<PathBuf> {
    if !is_plain_segment(bucket) {
        return Err(StratusError::InvalidUri(format!(
            "bucket {bucket:?} escapes the destination directory"
        )));
    }
    let mut path = dest_dir.join(bucket);
    let mut segments = 0;
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        if !is_plain_segment(segment) {
            return Err(StratusError::InvalidUri(format!(
                "key {key:?} escapes the destination directory"
            )));
        }
        path.push(segment);
        segments += 1;
    }
    if segments == 0 {
        return Err(StratusError::InvalidUri(format!(
            "s3://{bucket}/{key} does not name an object"
        )));
    }
    Ok(path)
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains(['/', '\\'])
}

impl ObjectStoreFacade {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Download an object into `dest_dir/bucket/key...`.
    ///
    /// Refuses to overwrite: an existing destination fails with
    /// [`StratusError::AlreadyExists`] before anything is fetched.
    pub async fn download(
        &self,
        uri: impl IntoStorageUri,
        dest_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let (bucket, key) = uri.into_storage_uri()?.into_parts();
        let dest_path = local_destination(dest_dir.as_ref(), &bucket, &key)?;

        if dest_path.exists() {
            return Err(StratusError::AlreadyExists(dest_path));
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.store
            .download_to_file(&bucket, &key, &dest_path)
            .await?;

        tracing::info!(bucket = %bucket, key = %key, path = %dest_path.display(), "Downloaded object");
        Ok(dest_path)
    }

    /// Read a whole object into memory.
    pub async fn get_blob(&self, uri: impl IntoStorageUri) -> Result<Vec<u8>> {
        let (bucket, key) = uri.into_storage_uri()?.into_parts();
        let data = self.store.get_object(&bucket, &key).await?;
        tracing::debug!(bucket = %bucket, key = %key, bytes = data.len(), "Fetched object");
        Ok(data)
    }

    /// Write `data` as the object at `uri`.
    pub async fn put_blob(&self, uri: impl IntoStorageUri, data: &[u8]) -> Result<()> {
        let (bucket, key) = uri.into_storage_uri()?.into_parts();
        self.store.put_object(&bucket, &key, data).await?;
        tracing::debug!(bucket = %bucket, key = %key, bytes = data.len(), "Stored object");
        Ok(())
    }

    /// Upload a local file to `uri`.
    pub async fn upload(&self, local_path: impl AsRef<Path>, uri: impl IntoStorageUri) -> Result<()> {
        let uri = uri.into_storage_uri()?;
        let data = tokio::fs::read(local_path.as_ref()).await?;
        self.put_blob(uri, &data).await
    }

    /// List every object whose key starts with the URI's key.
    ///
    /// Pages are fetched one after another, each request carrying the
    /// previous page's continuation token, and concatenated in the order
    /// the store returned them. A first page with no `Contents` at all
    /// fails with [`StratusError::NotFound`].
    pub async fn list_objects(&self, uri_prefix: impl IntoStorageUri) -> Result<Vec<ObjectEntry>> {
        let (bucket, prefix) = uri_prefix.into_storage_uri()?.into_parts();

        let mut entries = Vec::new();
        let mut token: Option<String> = None;
        let mut page_no = 0usize;

        loop {
            let page = self
                .store
                .list_objects_page(&bucket, &prefix, token.as_deref())
                .await?;
            page_no += 1;

            match page.contents {
                Some(contents) => {
                    tracing::debug!(
                        bucket = %bucket,
                        prefix = %prefix,
                        page = page_no,
                        entries = contents.len(),
                        truncated = page.is_truncated,
                        "Listed page"
                    );
                    entries.extend(contents);
                }
                None if page_no == 1 => {
                    return Err(StratusError::NotFound { bucket, prefix });
                }
                None => {}
            }

            if !page.is_truncated {
                break;
            }

            token = Some(page.next_continuation_token.ok_or_else(|| {
                StratusError::Pagination(format!(
                    "page {page_no} of s3://{bucket}/{prefix} is truncated but has no continuation token"
                ))
            })?);
        }

        Ok(entries)
    }

    /// Keys of [`ObjectStoreFacade::list_objects`], same order.
    pub async fn list_keys(&self, uri_prefix: impl IntoStorageUri) -> Result<Vec<String>> {
        Ok(self
            .list_objects(uri_prefix)
            .await?
            .into_iter()
            .map(|entry| entry.key)
            .collect())
    }

    /// Make an object readable by anyone.
    pub async fn make_public_read(&self, uri: impl IntoStorageUri) -> Result<AclAck> {
        self.set_object_acl(uri, CannedAcl::PublicRead).await
    }

    /// Replace an object's ACL with a canned one.
    pub async fn set_object_acl(&self, uri: impl IntoStorageUri, acl: CannedAcl) -> Result<AclAck> {
        let (bucket, key) = uri.into_storage_uri()?.into_parts();
        let ack = self.store.put_object_acl(&bucket, &key, acl).await?;
        tracing::info!(bucket = %bucket, key = %key, acl = %acl, "Updated object ACL");
        Ok(ack)
    }

    /// Current ACL of an object.
    pub async fn get_object_acl(&self, uri: impl IntoStorageUri) -> Result<ObjectAcl> {
        let (bucket, key) = uri.into_storage_uri()?.into_parts();
        Ok(self.store.get_object_acl(&bucket, &key).await?)
    }
}
