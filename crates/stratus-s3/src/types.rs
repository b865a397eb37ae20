use std::fmt;

use serde::{Deserialize, Serialize};

/// URI of the S3 group that stands for every anonymous caller.
pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// One object returned by a listing. Only `key` is interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectEntry {
    pub key: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, rename = "ETag")]
    pub e_tag: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub storage_class: Option<String>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
            e_tag: None,
            last_modified: None,
            storage_class: None,
        }
    }
}

/// One page of a prefix listing.
///
/// `contents` is `None` when the response carried no `Contents` field at
/// all, which S3 does when nothing matches the prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub contents: Option<Vec<ObjectEntry>>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// Canned ACLs accepted by `PutObjectAcl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement of an ACL write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclAck {
    pub request_charged: Option<String>,
}

/// Access control descriptor of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAcl {
    pub owner: Option<Owner>,
    pub grants: Vec<Grant>,
}

impl ObjectAcl {
    /// True when anonymous callers hold READ (or FULL_CONTROL).
    pub fn is_public_read(&self) -> bool {
        self.grants.iter().any(|g| {
            g.grantee.uri.as_deref() == Some(ALL_USERS_URI)
                && matches!(g.permission, Permission::Read | Permission::FullControl)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: Permission,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grantee {
    /// `CanonicalUser`, `Group` or `AmazonCustomerByEmail`.
    pub kind: String,
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
    pub uri: Option<String>,
}

impl Grantee {
    pub fn canonical_user(id: &str) -> Self {
        Self {
            kind: "CanonicalUser".to_string(),
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn group(uri: &str) -> Self {
        Self {
            kind: "Group".to_string(),
            uri: Some(uri.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    FullControl,
    Read,
    ReadAcp,
    Write,
    WriteAcp,
    #[serde(untagged)]
    Other(String),
}

impl Permission {
    pub fn parse(s: &str) -> Self {
        match s {
            "FULL_CONTROL" => Permission::FullControl,
            "READ" => Permission::Read,
            "READ_ACP" => Permission::ReadAcp,
            "WRITE" => Permission::Write,
            "WRITE_ACP" => Permission::WriteAcp,
            other => Permission::Other(other.to_string()),
        }
    }
}
