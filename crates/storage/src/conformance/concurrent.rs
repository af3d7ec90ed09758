use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use super::{make_waste_upload, TestResult};
use crate::record::UploadOptions;
use crate::traits::{BlobStore, RecordStore};
use crate::StorageError;

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_inserts_all_stored_with_distinct_ids",
            concurrent_inserts_all_stored_with_distinct_ids(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_uploads_same_key_exactly_one_wins",
            concurrent_uploads_same_key_exactly_one_wins(factory).await,
        ),
    ]
}

/// N tasks insert an upload row each; every row lands with a unique id.
async fn concurrent_inserts_all_stored_with_distinct_ids<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let s = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            s.insert_waste_upload(make_waste_upload(&format!("waste-{}.jpg", i), "PET"))
                .await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let rec = handle
            .await
            .map_err(|e| format!("task panicked: {}", e))?
            .map_err(|e| e.to_string())?;
        ids.insert(rec.id);
    }
    if ids.len() != N {
        return Err(format!("expected {} distinct ids, got {}", N, ids.len()));
    }

    let listed = storage
        .list_waste_uploads(0)
        .await
        .map_err(|e| e.to_string())?;
    if listed.len() != N {
        return Err(format!("expected {} rows, got {}", N, listed.len()));
    }
    Ok(())
}

/// N tasks race to upload the same key without upsert. Exactly one succeeds;
/// the rest must get AlreadyExists.
async fn concurrent_uploads_same_key_exactly_one_wins<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let s = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            s.upload(
                "waste-images",
                "race.jpg",
                vec![i as u8],
                UploadOptions::new("image/jpeg"),
            )
            .await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("task panicked: {}", e))? {
            Ok(()) => wins += 1,
            Err(StorageError::AlreadyExists { .. }) => conflicts += 1,
            Err(e) => return Err(format!("unexpected error: {}", e)),
        }
    }
    if wins != 1 || conflicts != N - 1 {
        return Err(format!(
            "expected 1 win and {} conflicts, got {} and {}",
            N - 1,
            wins,
            conflicts
        ));
    }
    Ok(())
}
