use std::path::Path;

use async_trait::async_trait;

use crate::types::{AclAck, CannedAcl, ListPage, ObjectAcl};

/// Trait for object-storage backends.
///
/// Every method is a single request against the store; pagination and
/// URI handling live in [`crate::facade::ObjectStoreFacade`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream an object into `path`. The parent directory must exist.
    async fn download_to_file(&self, bucket: &str, key: &str, path: &Path) -> anyhow::Result<()>;

    /// Read a whole object into memory.
    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>>;

    /// Write an object.
    async fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> anyhow::Result<()>;

    /// Fetch one page of keys starting with `prefix`.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> anyhow::Result<ListPage>;

    /// Replace an object's ACL with a canned one.
    async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: CannedAcl,
    ) -> anyhow::Result<AclAck>;

    /// Read an object's ACL.
    async fn get_object_acl(&self, bucket: &str, key: &str) -> anyhow::Result<ObjectAcl>;

    /// Backend name for display.
    fn name(&self) -> &str;
}
