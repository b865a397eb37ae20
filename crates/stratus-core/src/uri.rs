//! Storage URIs of the form `scheme://bucket/key/with/segments`.
//!
//! Only the authority (bucket) and the path (key, minus its leading `/`)
//! are kept. The scheme is checked for syntax but otherwise ignored, so
//! `s3://`, `s3a://` and `gs://` all resolve the same way. Query and
//! fragment parts are dropped.
//!
//! Serialized as a `{ bucket, key }` map, since `Display` output does not
//! survive a re-parse when the key contains `?` or `#`. Deserialization
//! accepts either that map or a URI string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StratusError};

/// A parsed bucket/key pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UriRepr")]
pub struct StorageUri {
    bucket: String,
    key: String,
}

impl StorageUri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse `scheme://bucket/key...`.
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| StratusError::InvalidUri(format!("missing `://` in {uri:?}")))?;

        if !is_valid_scheme(scheme) {
            return Err(StratusError::InvalidUri(format!(
                "invalid scheme {scheme:?} in {uri:?}"
            )));
        }

        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let rest = rest.split_once('?').map_or(rest, |(before, _)| before);

        let (bucket, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        validate_bucket(bucket).map_err(|reason| {
            StratusError::InvalidUri(format!("{reason} in {uri:?}"))
        })?;

        let key = path.strip_prefix('/').unwrap_or(path);

        Ok(Self::new(bucket, key))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn into_parts(self) -> (String, String) {
        (self.bucket, self.key)
    }
}

/// Buckets name a single path component: not empty, not `.` or `..`,
/// and free of path separators.
fn validate_bucket(bucket: &str) -> std::result::Result<(), String> {
    if bucket.is_empty() {
        return Err("empty bucket".to_string());
    }
    if bucket == "." || bucket == ".." || bucket.contains(['/', '\\']) {
        return Err(format!("invalid bucket {bucket:?}"));
    }
    Ok(())
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl FromStr for StorageUri {
    type Err = StratusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for StorageUri {
    type Error = StratusError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StorageUri {
    type Error = StratusError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<StorageUri> for String {
    fn from(uri: StorageUri) -> Self {
        uri.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UriRepr {
    Uri(String),
    Parts { bucket: String, key: String },
}

impl TryFrom<UriRepr> for StorageUri {
    type Error = StratusError;

    fn try_from(repr: UriRepr) -> Result<Self> {
        match repr {
            UriRepr::Uri(uri) => Self::parse(&uri),
            UriRepr::Parts { bucket, key } => {
                validate_bucket(&bucket).map_err(StratusError::InvalidUri)?;
                Ok(Self { bucket, key })
            }
        }
    }
}

/// Anything an object operation accepts as a location: a URI string or
/// an already-parsed [`StorageUri`].
pub trait IntoStorageUri {
    fn into_storage_uri(self) -> Result<StorageUri>;
}

impl IntoStorageUri for StorageUri {
    fn into_storage_uri(self) -> Result<StorageUri> {
        Ok(self)
    }
}

impl IntoStorageUri for &StorageUri {
    fn into_storage_uri(self) -> Result<StorageUri> {
        Ok(self.clone())
    }
}

impl IntoStorageUri for &str {
    fn into_storage_uri(self) -> Result<StorageUri> {
        StorageUri::parse(self)
    }
}

impl IntoStorageUri for String {
    fn into_storage_uri(self) -> Result<StorageUri> {
        StorageUri::parse(&self)
    }
}

impl IntoStorageUri for &String {
    fn into_storage_uri(self) -> Result<StorageUri> {
        StorageUri::parse(self)
    }
}

/// Return the `(bucket, key)` pair for a storage location.
pub fn parse_uri(uri: impl IntoStorageUri) -> Result<(String, String)> {
    Ok(uri.into_storage_uri()?.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_and_key() {
        let (bucket, key) = parse_uri("s3://bucket1/a/b/c").unwrap();
        assert_eq!(bucket, "bucket1");
        assert_eq!(key, "a/b/c");
    }

    #[test]
    fn bucket_only_has_empty_key() {
        assert_eq!(parse_uri("s3://bucket1").unwrap().1, "");
        assert_eq!(parse_uri("s3://bucket1/").unwrap().1, "");
    }

    #[test]
    fn only_the_first_slash_is_stripped() {
        let uri = StorageUri::parse("s3://bucket1//nested/key/").unwrap();
        assert_eq!(uri.key(), "/nested/key/");
    }

    #[test]
    fn scheme_is_ignored() {
        let a = StorageUri::parse("s3://b/k").unwrap();
        let b = StorageUri::parse("gs://b/k").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn query_and_fragment_are_dropped() {
        let uri = StorageUri::parse("s3://b/reports/q1.csv?versionId=3#top").unwrap();
        assert_eq!(uri.key(), "reports/q1.csv");
    }

    #[test]
    fn malformed_uris_are_rejected() {
        for bad in ["bucket/key", "://bucket/key", "1s3://b/k", "s3:///key", ""] {
            let err = StorageUri::parse(bad).unwrap_err();
            assert!(matches!(err, StratusError::InvalidUri(_)), "{bad:?}");
        }
    }

    #[test]
    fn dot_buckets_are_rejected() {
        for bad in ["s3://../etc/cron.d/job", "s3://./x", "s3://..", "s3://a\\b/k"] {
            let err = StorageUri::parse(bad).unwrap_err();
            assert!(matches!(err, StratusError::InvalidUri(_)), "{bad:?}");
        }
    }

    #[test]
    fn parsed_uri_passes_through() {
        let uri = StorageUri::new("data", "raw/part-0000");
        let (bucket, key) = parse_uri(&uri).unwrap();
        assert_eq!((bucket.as_str(), key.as_str()), ("data", "raw/part-0000"));
    }

    #[test]
    fn serde_keeps_bucket_and_key() {
        let uri = StorageUri::new("data", "raw/x");
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, r#"{"bucket":"data","key":"raw/x"}"#);
        let back: StorageUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
    }

    #[test]
    fn serde_roundtrips_keys_with_query_characters() {
        let uri = StorageUri::new("b", "reports/a?b#c.csv");
        let json = serde_json::to_string(&uri).unwrap();
        let back: StorageUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
        assert_eq!(back.key(), "reports/a?b#c.csv");
    }

    #[test]
    fn serde_accepts_uri_strings() {
        let uri: StorageUri = serde_json::from_str(r#""s3://data/raw/x""#).unwrap();
        assert_eq!(uri, StorageUri::new("data", "raw/x"));
        assert!(serde_json::from_str::<StorageUri>(r#""no-scheme""#).is_err());
        assert!(serde_json::from_str::<StorageUri>(r#"{"bucket":"..","key":"x"}"#).is_err());
    }
}
