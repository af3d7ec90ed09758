use std::future::Future;

use super::{make_waste_upload, TestResult};
use crate::traits::{BlobStore, RecordStore};
use crate::StorageError;

pub(super) async fn run_upload_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "uploads",
            "insert_returns_stored_row_with_id",
            insert_returns_stored_row_with_id(factory).await,
        ),
        TestResult::from_result(
            "uploads",
            "analysis_blob_is_kept_verbatim",
            analysis_blob_is_kept_verbatim(factory).await,
        ),
        TestResult::from_result(
            "uploads",
            "list_is_newest_first",
            list_is_newest_first(factory).await,
        ),
        TestResult::from_result(
            "uploads",
            "list_respects_limit",
            list_respects_limit(factory).await,
        ),
        TestResult::from_result(
            "uploads",
            "negative_weight_is_invalid_record",
            negative_weight_is_invalid_record(factory).await,
        ),
        TestResult::from_result(
            "uploads",
            "optional_columns_may_be_absent",
            optional_columns_may_be_absent(factory).await,
        ),
    ]
}

async fn insert_returns_stored_row_with_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = s
        .insert_waste_upload(make_waste_upload("waste-1.jpg", "PET"))
        .await
        .map_err(|e| e.to_string())?;
    if rec.id.is_empty() {
        return Err("stored row has an empty id".to_string());
    }
    if rec.uploaded_at.is_empty() {
        return Err("stored row has no uploaded_at".to_string());
    }
    if rec.image_path != "waste-1.jpg" || rec.weight_grams != Some(500.0) {
        return Err(format!("stored row does not match insert: {:?}", rec));
    }
    Ok(())
}

async fn analysis_blob_is_kept_verbatim<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let row = make_waste_upload("waste-2.jpg", "HDPE");
    let expected = row.analysis.clone();
    s.insert_waste_upload(row).await.map_err(|e| e.to_string())?;
    let listed = s.list_waste_uploads(0).await.map_err(|e| e.to_string())?;
    match listed.first() {
        Some(rec) if rec.analysis == expected => Ok(()),
        Some(rec) => Err(format!("analysis changed: {}", rec.analysis)),
        None => Err("inserted upload not listed".to_string()),
    }
}

async fn list_is_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for i in 0..3 {
        s.insert_waste_upload(make_waste_upload(&format!("waste-{}.jpg", i), "PET"))
            .await
            .map_err(|e| e.to_string())?;
    }
    let listed = s.list_waste_uploads(0).await.map_err(|e| e.to_string())?;
    let paths: Vec<&str> = listed.iter().map(|r| r.image_path.as_str()).collect();
    if paths != ["waste-2.jpg", "waste-1.jpg", "waste-0.jpg"] {
        return Err(format!("unexpected order: {:?}", paths));
    }
    Ok(())
}

async fn list_respects_limit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for i in 0..5 {
        s.insert_waste_upload(make_waste_upload(&format!("waste-{}.jpg", i), "PET"))
            .await
            .map_err(|e| e.to_string())?;
    }
    let listed = s.list_waste_uploads(2).await.map_err(|e| e.to_string())?;
    if listed.len() != 2 {
        return Err(format!("expected 2 rows, got {}", listed.len()));
    }
    if listed[0].image_path != "waste-4.jpg" {
        return Err(format!("limit kept the wrong rows: {}", listed[0].image_path));
    }
    Ok(())
}

async fn negative_weight_is_invalid_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut row = make_waste_upload("waste-neg.jpg", "PET");
    row.weight_grams = Some(-5.0);
    match s.insert_waste_upload(row).await {
        Err(StorageError::InvalidRecord { .. }) => {}
        Err(e) => return Err(format!("expected InvalidRecord, got {}", e)),
        Ok(_) => return Err("negative weight accepted".to_string()),
    }
    let listed = s.list_waste_uploads(0).await.map_err(|e| e.to_string())?;
    if !listed.is_empty() {
        return Err("rejected row was stored".to_string());
    }
    Ok(())
}

async fn optional_columns_may_be_absent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut row = make_waste_upload("waste-bare.jpg", "PET");
    row.waste_type = None;
    row.classification = None;
    row.weight_grams = None;
    let rec = s.insert_waste_upload(row).await.map_err(|e| e.to_string())?;
    if rec.weight_grams.is_some() || rec.waste_type.is_some() {
        return Err(format!("absent columns came back populated: {:?}", rec));
    }
    Ok(())
}
