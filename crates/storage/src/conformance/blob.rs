use std::future::Future;

use super::TestResult;
use crate::record::UploadOptions;
use crate::traits::{BlobStore, RecordStore};
use crate::StorageError;

const BUCKET: &str = "waste-images";

pub(super) async fn run_blob_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "blob",
            "uploaded_bytes_read_back_unchanged",
            uploaded_bytes_read_back_unchanged(factory).await,
        ),
        TestResult::from_result(
            "blob",
            "upload_without_upsert_rejects_existing_key",
            upload_without_upsert_rejects_existing_key(factory).await,
        ),
        TestResult::from_result(
            "blob",
            "upsert_replaces_existing_object",
            upsert_replaces_existing_object(factory).await,
        ),
        TestResult::from_result(
            "blob",
            "download_missing_key_is_object_not_found",
            download_missing_key_is_object_not_found(factory).await,
        ),
        TestResult::from_result(
            "blob",
            "buckets_are_independent",
            buckets_are_independent(factory).await,
        ),
        TestResult::from_result(
            "blob",
            "public_url_is_stable_and_names_the_key",
            public_url_is_stable_and_names_the_key(factory).await,
        ),
    ]
}

async fn uploaded_bytes_read_back_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
    s.upload(BUCKET, "a.jpg", bytes.clone(), UploadOptions::new("image/jpeg"))
        .await
        .map_err(|e| e.to_string())?;
    let read = s.download(BUCKET, "a.jpg").await.map_err(|e| e.to_string())?;
    if read != bytes {
        return Err(format!("expected {:?}, got {:?}", bytes, read));
    }
    Ok(())
}

/// A second upload under the same key must conflict, and the first object survives.
async fn upload_without_upsert_rejects_existing_key<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upload(BUCKET, "dup.jpg", vec![1], UploadOptions::new("image/jpeg"))
        .await
        .map_err(|e| e.to_string())?;
    match s
        .upload(BUCKET, "dup.jpg", vec![2], UploadOptions::new("image/jpeg"))
        .await
    {
        Err(StorageError::AlreadyExists { bucket, key }) => {
            if bucket != BUCKET || key != "dup.jpg" {
                return Err(format!("wrong conflict fields: {}/{}", bucket, key));
            }
        }
        Err(e) => return Err(format!("expected AlreadyExists, got {}", e)),
        Ok(()) => return Err("second upload silently overwrote the object".to_string()),
    }
    let read = s.download(BUCKET, "dup.jpg").await.map_err(|e| e.to_string())?;
    if read != vec![1] {
        return Err(format!("original object was modified: {:?}", read));
    }
    Ok(())
}

async fn upsert_replaces_existing_object<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upload(BUCKET, "u.jpg", vec![1], UploadOptions::new("image/jpeg"))
        .await
        .map_err(|e| e.to_string())?;
    let options = UploadOptions {
        upsert: true,
        ..UploadOptions::new("image/jpeg")
    };
    s.upload(BUCKET, "u.jpg", vec![9, 9], options)
        .await
        .map_err(|e| e.to_string())?;
    let read = s.download(BUCKET, "u.jpg").await.map_err(|e| e.to_string())?;
    if read != vec![9, 9] {
        return Err(format!("expected replaced bytes, got {:?}", read));
    }
    Ok(())
}

async fn download_missing_key_is_object_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.download(BUCKET, "missing.jpg").await {
        Err(StorageError::ObjectNotFound { key, .. }) if key == "missing.jpg" => Ok(()),
        Err(e) => Err(format!("expected ObjectNotFound, got {}", e)),
        Ok(_) => Err("download of a missing key succeeded".to_string()),
    }
}

/// The same key in two buckets names two objects.
async fn buckets_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.upload(BUCKET, "same.jpg", vec![1], UploadOptions::new("image/jpeg"))
        .await
        .map_err(|e| e.to_string())?;
    s.upload("other", "same.jpg", vec![2], UploadOptions::new("image/jpeg"))
        .await
        .map_err(|e| format!("upload to second bucket failed: {}", e))?;
    let a = s.download(BUCKET, "same.jpg").await.map_err(|e| e.to_string())?;
    let b = s.download("other", "same.jpg").await.map_err(|e| e.to_string())?;
    if a == b {
        return Err("objects in different buckets collided".to_string());
    }
    Ok(())
}

async fn public_url_is_stable_and_names_the_key<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = s.public_url(BUCKET, "waste-1-abc.jpg");
    let second = s.public_url(BUCKET, "waste-1-abc.jpg");
    if first != second {
        return Err(format!("public_url not stable: {} vs {}", first, second));
    }
    if !first.ends_with("waste-1-abc.jpg") || !first.contains(BUCKET) {
        return Err(format!("public_url does not name bucket and key: {}", first));
    }
    Ok(())
}
