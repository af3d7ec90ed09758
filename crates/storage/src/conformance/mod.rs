//! Conformance test suite for SmartBin storage backends.
//!
//! Any type implementing both [`BlobStore`] and [`RecordStore`] can run this
//! suite to verify it behaves the way the deposit pipeline expects. The
//! suite covers:
//!
//! - **Blobs**: upload/download, no silent overwrite, upsert, public URLs
//! - **Uploads**: insert returns the stored row, listing order and limits
//! - **Chat**: conversation rows keep message, response and type
//! - **Orders**: foreign-key check on `waste_upload_id`, status filtering
//! - **Concurrency**: parallel inserts and uploads from many tasks
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that
//! creates a fresh, empty backend for each test:
//!
//! ```ignore
//! use smartbin_storage::conformance::run_conformance_suite;
//! use smartbin_storage::MemoryBackend;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryBackend::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod blob;
mod chat;
mod concurrent;
mod orders;
mod uploads;

use std::fmt;
use std::future::Future;

use crate::record::{NewPickupOrder, NewWasteUpload, OrderStatus};
use crate::traits::{BlobStore, RecordStore};

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "blob", "orders").
    pub category: String,
    /// Test name (e.g. "upload_without_upsert_rejects_existing_key").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// backend, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(blob::run_blob_tests(&factory).await);
    results.extend(uploads::run_upload_tests(&factory).await);
    results.extend(chat::run_chat_tests(&factory).await);
    results.extend(orders::run_order_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_waste_upload(key: &str, waste_type: &str) -> NewWasteUpload {
    NewWasteUpload {
        image_url: format!("https://cdn.test/waste-images/{}", key),
        image_path: key.to_string(),
        analysis: serde_json::json!({
            "wasteType": waste_type,
            "classification": "bottle",
            "recommendations": "rinse",
            "recyclingTips": "crush before disposal",
        }),
        waste_type: Some(waste_type.to_string()),
        classification: Some("bottle".to_string()),
        weight_grams: Some(500.0),
        pickup_lat: None,
        pickup_lng: None,
    }
}

fn make_pickup_order(waste_upload_id: Option<String>, status: OrderStatus) -> NewPickupOrder {
    NewPickupOrder {
        waste_upload_id,
        status,
        estimated_weight_grams: Some(1500.0),
        latitude: Some(12.97),
        longitude: Some(77.59),
        pickup_address: Some("1 Green Street".to_string()),
        special_instructions: None,
    }
}
