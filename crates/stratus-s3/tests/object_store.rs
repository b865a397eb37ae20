/// End-to-end tests of the object store facade.
///
/// The local tests run everywhere. The AWS tests need real credentials and
/// a scratch bucket, and are skipped if env vars are not set.
///
/// Run with:
///   STRATUS_TEST_BUCKET=stratus-test-bucket AWS_REGION=us-west-2 \
///   cargo test -p stratus-s3 --test object_store -- --nocapture
use std::sync::Arc;

use stratus_core::StratusError;
use stratus_s3::ObjectStoreFacade;
use stratus_s3::local::LocalObjectStore;
use tempfile::TempDir;

fn local_facade(tmp: &TempDir, page_size: usize) -> ObjectStoreFacade {
    let store = LocalObjectStore::new(tmp.path(), "local-e2e")
        .unwrap()
        .with_page_size(page_size);
    store.create_bucket("archive").unwrap();
    ObjectStoreFacade::new(Arc::new(store))
}

#[tokio::test]
async fn listing_spans_many_pages() {
    let tmp = TempDir::new().unwrap();
    let facade = local_facade(&tmp, 7);

    for i in 0..50 {
        let uri = format!("s3://archive/2024/day-{i:03}.log");
        facade.put_blob(uri.as_str(), b"entry").await.unwrap();
    }
    facade.put_blob("s3://archive/2025/day-000.log", b"entry").await.unwrap();

    let keys = facade.list_keys("s3://archive/2024/").await.unwrap();
    assert_eq!(keys.len(), 50);
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys[0], "2024/day-000.log");
    assert_eq!(keys[49], "2024/day-049.log");

    let objects = facade.list_objects("s3://archive/2024/").await.unwrap();
    assert!(objects.iter().all(|o| o.size == 5));
}

#[tokio::test]
async fn absent_prefix_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let facade = local_facade(&tmp, 10);
    facade.put_blob("s3://archive/present.txt", b"x").await.unwrap();

    let err = facade.list_keys("s3://archive/absent/").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn missing_bucket_is_a_remote_error() {
    let tmp = TempDir::new().unwrap();
    let facade = local_facade(&tmp, 10);

    let err = facade.list_keys("s3://nobucket/x").await.unwrap_err();
    assert!(matches!(err, StratusError::Remote(_)));
}

#[tokio::test]
async fn download_every_listed_object() {
    let tmp = TempDir::new().unwrap();
    let facade = local_facade(&tmp, 3);
    for name in ["a/1.bin", "a/2.bin", "a/b/3.bin", "a/b/c/4.bin"] {
        let uri = format!("s3://archive/{name}");
        facade.put_blob(uri.as_str(), name.as_bytes()).await.unwrap();
    }

    let dest = TempDir::new().unwrap();
    for key in facade.list_keys("s3://archive/a/").await.unwrap() {
        let uri = format!("s3://archive/{key}");
        let path = facade.download(uri.as_str(), dest.path()).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), key.as_bytes());
    }
    assert!(dest.path().join("archive/a/b/c/4.bin").is_file());
}

#[cfg(feature = "aws")]
mod aws_tests {
    use super::*;
    use stratus_s3::s3::S3ObjectStore;

    async fn get_aws_facade() -> Option<(ObjectStoreFacade, String)> {
        let bucket = std::env::var("STRATUS_TEST_BUCKET").ok()?;
        if bucket.is_empty() {
            return None;
        }
        let region = std::env::var("AWS_REGION").ok();
        let store = S3ObjectStore::new(region.as_deref(), "s3-test").await.ok()?;
        Some((ObjectStoreFacade::new(Arc::new(store)), bucket))
    }

    #[tokio::test]
    async fn aws_put_list_get_download() {
        let Some((facade, bucket)) = get_aws_facade().await else {
            eprintln!("SKIP: STRATUS_TEST_BUCKET not set");
            return;
        };

        let uri = format!("s3://{bucket}/stratus/test/integration-object");
        let data = b"Hello from Stratus integration test - S3!";

        facade.put_blob(uri.as_str(), data).await.expect("put failed");
        println!("OK: S3 put");

        let keys = facade
            .list_keys(format!("s3://{bucket}/stratus/test/").as_str())
            .await
            .expect("list failed");
        assert!(keys.iter().any(|k| k == "stratus/test/integration-object"));
        println!("OK: S3 list ({} keys)", keys.len());

        let blob = facade.get_blob(uri.as_str()).await.expect("get failed");
        assert_eq!(blob, data);
        println!("OK: S3 get matches");

        let dest = TempDir::new().unwrap();
        let path = facade.download(uri.as_str(), dest.path()).await.expect("download failed");
        assert_eq!(std::fs::read(path).unwrap(), data);
        println!("OK: S3 download matches");

        let acl = facade.get_object_acl(uri.as_str()).await.expect("get acl failed");
        assert!(!acl.grants.is_empty());
        println!("OK: S3 ACL has {} grants", acl.grants.len());
    }

    #[tokio::test]
    async fn aws_absent_prefix_is_not_found() {
        let Some((facade, bucket)) = get_aws_facade().await else {
            eprintln!("SKIP: STRATUS_TEST_BUCKET not set");
            return;
        };

        let err = facade
            .list_objects(format!("s3://{bucket}/stratus/definitely-absent-prefix/").as_str())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
