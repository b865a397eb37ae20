use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use stratus_core::config::DEFAULT_PAGE_SIZE;
use thiserror::Error;
use walkdir::WalkDir;

use crate::download::write_new_file;
use crate::provider::ObjectStore;
use crate::types::{
    ALL_USERS_URI, AclAck, CannedAcl, Grant, Grantee, ListPage, ObjectAcl, ObjectEntry, Owner,
    Permission,
};

const LOCAL_OWNER: &str = "local";
const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("NoSuchBucket: {0}")]
    NoSuchBucket(String),

    #[error("NoSuchKey: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
}

/// Filesystem-backed object store for local development and tests.
///
/// Each bucket is a directory under `root`; keys map to relative paths.
/// Listings are returned in key order, `page_size` entries at a time,
/// with the last key of a page as the continuation token. ACLs are held
/// in memory only.
///
/// Unlike S3, a key cannot also be the directory of a longer key: once
/// `a` exists, `a/b` cannot be written, and the other way round.
pub struct LocalObjectStore {
    root: PathBuf,
    page_size: usize,
    acls: Mutex<HashMap<(String, String), CannedAcl>>,
    name: String,
}

impl LocalObjectStore {
    pub fn new(root: &Path, name: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            page_size: DEFAULT_PAGE_SIZE,
            acls: Mutex::new(HashMap::new()),
            name: name.to_string(),
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create the directory for `bucket`.
    pub fn create_bucket(&self, bucket: &str) -> anyhow::Result<()> {
        validate_segment(bucket)?;
        std::fs::create_dir_all(self.root.join(bucket))?;
        Ok(())
    }

    fn bucket_path(&self, bucket: &str) -> anyhow::Result<PathBuf> {
        validate_segment(bucket)?;
        let path = self.root.join(bucket);
        if !path.is_dir() {
            return Err(LocalStoreError::NoSuchBucket(bucket.to_string()).into());
        }
        Ok(path)
    }

    fn object_path(&self, bucket: &str, key: &str) -> anyhow::Result<PathBuf> {
        let mut path = self.bucket_path(bucket)?;
        if key.is_empty() {
            return Err(LocalStoreError::InvalidKey(key.to_string()).into());
        }
        for segment in key.split('/') {
            validate_segment(segment).map_err(|_| LocalStoreError::InvalidKey(key.to_string()))?;
            path.push(segment);
        }
        Ok(path)
    }

    fn existing_object(&self, bucket: &str, key: &str) -> anyhow::Result<PathBuf> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(LocalStoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
            .into());
        }
        Ok(path)
    }

    /// All keys of `bucket` starting with `prefix`, sorted.
    fn matching_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<(String, u64)>> {
        let bucket_path = self.bucket_path(bucket)?;
        let mut keys = Vec::new();

        for entry in WalkDir::new(&bucket_path).min_depth(1).follow_links(true) {
            let entry = entry.with_context(|| format!("cannot walk bucket {bucket}"))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&bucket_path)?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                let size = entry
                    .metadata()
                    .with_context(|| format!("cannot stat {}", entry.path().display()))?
                    .len();
                keys.push((key, size));
            }
        }

        keys.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(keys)
    }

    fn acls(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), CannedAcl>> {
        self.acls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn validate_segment(segment: &str) -> Result<(), LocalStoreError> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
        return Err(LocalStoreError::InvalidKey(segment.to_string()));
    }
    Ok(())
}

fn grants_for(acl: CannedAcl) -> Vec<Grant> {
    let mut grants = vec![Grant {
        grantee: Grantee::canonical_user(LOCAL_OWNER),
        permission: Permission::FullControl,
    }];
    match acl {
        CannedAcl::PublicRead => grants.push(Grant {
            grantee: Grantee::group(ALL_USERS_URI),
            permission: Permission::Read,
        }),
        CannedAcl::PublicReadWrite => {
            grants.push(Grant {
                grantee: Grantee::group(ALL_USERS_URI),
                permission: Permission::Read,
            });
            grants.push(Grant {
                grantee: Grantee::group(ALL_USERS_URI),
                permission: Permission::Write,
            });
        }
        CannedAcl::AuthenticatedRead => grants.push(Grant {
            grantee: Grantee::group(AUTHENTICATED_USERS_URI),
            permission: Permission::Read,
        }),
        CannedAcl::Private | CannedAcl::BucketOwnerRead | CannedAcl::BucketOwnerFullControl => {}
    }
    grants
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn download_to_file(&self, bucket: &str, key: &str, path: &Path) -> anyhow::Result<()> {
        let source = self.existing_object(bucket, key)?;
        let reader = tokio::fs::File::open(&source).await?;
        write_new_file(reader, path).await?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.existing_object(bucket, key)?;
        Ok(std::fs::read(&path)?)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> anyhow::Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        Ok(())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> anyhow::Result<ListPage> {
        let keys = self.matching_keys(bucket, prefix)?;
        let start = match continuation_token {
            Some(token) => keys.partition_point(|(key, _)| key.as_str() <= token),
            None => 0,
        };
        let remaining = &keys[start..];
        let page = &remaining[..remaining.len().min(self.page_size)];
        let is_truncated = remaining.len() > page.len();

        let contents: Vec<ObjectEntry> = page
            .iter()
            .map(|(key, size)| {
                let mut entry = ObjectEntry::new(key.clone(), *size as i64);
                entry.storage_class = Some("STANDARD".to_string());
                entry
            })
            .collect();

        Ok(ListPage {
            next_continuation_token: if is_truncated {
                contents.last().map(|e| e.key.clone())
            } else {
                None
            },
            contents: if contents.is_empty() {
                None
            } else {
                Some(contents)
            },
            is_truncated,
        })
    }

    async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: CannedAcl,
    ) -> anyhow::Result<AclAck> {
        self.existing_object(bucket, key)?;
        self.acls()
            .insert((bucket.to_string(), key.to_string()), acl);
        Ok(AclAck::default())
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> anyhow::Result<ObjectAcl> {
        self.existing_object(bucket, key)?;
        let acl = self
            .acls()
            .get(&(bucket.to_string(), key.to_string()))
            .copied()
            .unwrap_or(CannedAcl::Private);
        Ok(ObjectAcl {
            owner: Some(Owner {
                id: Some(LOCAL_OWNER.to_string()),
                display_name: Some(LOCAL_OWNER.to_string()),
            }),
            grants: grants_for(acl),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
