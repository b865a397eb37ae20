use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use aws_sdk_s3::types::{Object, ObjectCannedAcl};

use crate::download::write_new_file;
use crate::provider::ObjectStore;
use crate::types::{
    AclAck, CannedAcl, Grant, Grantee, ListPage, ObjectAcl, ObjectEntry, Owner, Permission,
};

/// AWS S3 and S3-compatible object store.
///
/// Works with AWS S3, MinIO, Garage, Ceph RGW, SeaweedFS, and any other
/// service implementing the S3 API.
pub struct S3ObjectStore {
    client: Client,
    name: String,
}

/// Options for creating an S3 client.
#[derive(Default)]
pub struct S3Options<'a> {
    pub region: Option<&'a str>,
    pub name: &'a str,
    /// Custom endpoint URL (e.g. `http://localhost:9000` for MinIO).
    pub endpoint_url: Option<&'a str>,
    /// Force path-style addressing (`http://host/bucket/key` instead of `http://bucket.host/key`).
    /// Most S3-compatible servers require this.
    pub path_style: bool,
    /// Explicit access key. If None, uses env/profile credentials.
    pub access_key: Option<&'a str>,
    /// Explicit secret key. If None, uses env/profile credentials.
    pub secret_key: Option<&'a str>,
}

impl S3ObjectStore {
    /// Create for standard AWS S3.
    pub async fn new(region: Option<&str>, name: &str) -> anyhow::Result<Self> {
        Self::with_options(S3Options {
            region,
            name,
            ..Default::default()
        })
        .await
    }

    /// Create for an S3-compatible service (MinIO, Garage, etc.)
    pub async fn s3_compatible(
        endpoint_url: &str,
        region: Option<&str>,
        name: &str,
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> anyhow::Result<Self> {
        Self::with_options(S3Options {
            region: Some(region.unwrap_or("us-east-1")),
            name,
            endpoint_url: Some(endpoint_url),
            path_style: true,
            access_key,
            secret_key,
        })
        .await
    }

    /// Create with full options.
    pub async fn with_options(opts: S3Options<'_>) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::from_env();

        if let Some(r) = opts.region {
            config_loader = config_loader.region(aws_config::Region::new(r.to_string()));
        }

        // If explicit credentials are provided, inject them
        if let (Some(ak), Some(sk)) = (opts.access_key, opts.secret_key) {
            let creds = aws_sdk_s3::config::Credentials::new(ak, sk, None, None, "stratus-config");
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = opts.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if opts.path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Ok(Self {
            client,
            name: opts.name.to_string(),
        })
    }

    /// Wrap an already-configured SDK client.
    pub fn from_client(client: Client, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
        }
    }
}

fn entry_from_object(obj: &Object) -> ObjectEntry {
    ObjectEntry {
        key: obj.key().unwrap_or_default().to_string(),
        size: obj.size().unwrap_or_default(),
        e_tag: obj.e_tag().map(str::to_string),
        last_modified: obj
            .last_modified()
            .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
        storage_class: obj.storage_class().map(|c| c.as_str().to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download_to_file(&self, bucket: &str, key: &str, path: &Path) -> anyhow::Result<()> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("S3 get_object({bucket}/{key}) failed"))?;

        let written = write_new_file(Box::pin(resp.body.into_async_read()), path)
            .await
            .with_context(|| format!("S3 download of {bucket}/{key} failed"))?;
        tracing::debug!(bucket, key, bytes = written, "S3 object streamed to file");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("S3 get_object({bucket}/{key}) failed"))?;
        let data = resp.body.collect().await?;
        Ok(data.to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .with_context(|| format!("S3 put_object({bucket}/{key}) failed"))?;
        Ok(())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> anyhow::Result<ListPage> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token.map(str::to_string))
            .send()
            .await
            .with_context(|| format!("S3 list_objects_v2({bucket}/{prefix}) failed"))?;

        Ok(ListPage {
            contents: resp
                .contents
                .as_ref()
                .map(|objects| objects.iter().map(entry_from_object).collect()),
            is_truncated: resp.is_truncated().unwrap_or(false),
            next_continuation_token: resp.next_continuation_token().map(str::to_string),
        })
    }

    async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: CannedAcl,
    ) -> anyhow::Result<AclAck> {
        let resp = self
            .client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .send()
            .await
            .with_context(|| format!("S3 put_object_acl({bucket}/{key}, {acl}) failed"))?;

        Ok(AclAck {
            request_charged: resp.request_charged().map(|r| r.as_str().to_string()),
        })
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> anyhow::Result<ObjectAcl> {
        let resp = self
            .client
            .get_object_acl()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("S3 get_object_acl({bucket}/{key}) failed"))?;

        let owner = resp.owner().map(|o| Owner {
            id: o.id().map(str::to_string),
            display_name: o.display_name().map(str::to_string),
        });

        let grants = resp
            .grants()
            .iter()
            .filter_map(|g| {
                let grantee = g.grantee()?;
                Some(Grant {
                    grantee: Grantee {
                        kind: grantee.r#type().as_str().to_string(),
                        id: grantee.id().map(str::to_string),
                        display_name: grantee.display_name().map(str::to_string),
                        email_address: grantee.email_address().map(str::to_string),
                        uri: grantee.uri().map(str::to_string),
                    },
                    permission: Permission::parse(g.permission()?.as_str()),
                })
            })
            .collect();

        Ok(ObjectAcl { owner, grants })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
