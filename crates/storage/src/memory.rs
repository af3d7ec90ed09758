//! In-process backend for tests, demos and the `--memory` flag of the CLI.
//!
//! Objects live in a map keyed by `(bucket, key)`; each table is a `Vec` in
//! insertion order. IDs come from a single monotonic counter shared by all
//! tables, so they are unique across the whole backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{
    ChatConversationRecord, NewChatConversation, NewPickupOrder, NewWasteUpload, OrderStatus,
    PickupOrderRecord, UploadOptions, WasteUploadRecord, ORDERS_TABLE, WASTE_UPLOADS_TABLE,
};
use crate::traits::{BlobStore, RecordStore};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct Tables {
    uploads: Vec<WasteUploadRecord>,
    chats: Vec<ChatConversationRecord>,
    orders: Vec<PickupOrderRecord>,
}

/// Blob and record storage held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    tables: RwLock<Tables>,
    next_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all buckets.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Content type recorded for an object, if it exists.
    pub async fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }
}

fn now_rfc3339() -> Result<String, StorageError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| StorageError::Backend(format!("timestamp formatting failed: {}", e)))
}

fn check_weight(table: &str, weight: Option<f64>) -> Result<(), StorageError> {
    match weight {
        Some(w) if !w.is_finite() || w < 0.0 => Err(StorageError::InvalidRecord {
            table: table.to_string(),
            message: format!("weight must be a non-negative number, got {}", w),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<(), StorageError> {
        let mut objects = self.objects.write().await;
        let slot = (bucket.to_string(), key.to_string());
        if !options.upsert && objects.contains_key(&slot) {
            return Err(StorageError::AlreadyExists {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        objects.insert(
            slot,
            StoredObject {
                bytes,
                content_type: options.content_type,
            },
        );
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn insert_waste_upload(
        &self,
        row: NewWasteUpload,
    ) -> Result<WasteUploadRecord, StorageError> {
        check_weight(WASTE_UPLOADS_TABLE, row.weight_grams)?;
        let record = WasteUploadRecord::from_new(self.next_id("upload"), now_rfc3339()?, row);
        self.tables.write().await.uploads.push(record.clone());
        Ok(record)
    }

    async fn list_waste_uploads(
        &self,
        limit: usize,
    ) -> Result<Vec<WasteUploadRecord>, StorageError> {
        let tables = self.tables.read().await;
        let newest_first = tables.uploads.iter().rev().cloned();
        Ok(if limit == 0 {
            newest_first.collect()
        } else {
            newest_first.take(limit).collect()
        })
    }

    async fn insert_chat_conversation(
        &self,
        row: NewChatConversation,
    ) -> Result<ChatConversationRecord, StorageError> {
        let record = ChatConversationRecord {
            id: self.next_id("chat"),
            message: row.message,
            response: row.response,
            message_type: row.message_type,
            created_at: now_rfc3339()?,
        };
        self.tables.write().await.chats.push(record.clone());
        Ok(record)
    }

    async fn insert_pickup_order(
        &self,
        row: NewPickupOrder,
    ) -> Result<PickupOrderRecord, StorageError> {
        check_weight(ORDERS_TABLE, row.estimated_weight_grams)?;
        let mut tables = self.tables.write().await;
        if let Some(upload_id) = &row.waste_upload_id {
            if !tables.uploads.iter().any(|u| &u.id == upload_id) {
                return Err(StorageError::RecordNotFound {
                    table: WASTE_UPLOADS_TABLE.to_string(),
                    id: upload_id.clone(),
                });
            }
        }
        let now = now_rfc3339()?;
        let record = PickupOrderRecord {
            id: self.next_id("order"),
            waste_upload_id: row.waste_upload_id,
            status: row.status,
            estimated_weight_grams: row.estimated_weight_grams,
            latitude: row.latitude,
            longitude: row.longitude,
            pickup_address: row.pickup_address,
            special_instructions: row.special_instructions,
            created_at: now.clone(),
            updated_at: now,
        };
        tables.orders.push(record.clone());
        Ok(record)
    }

    async fn list_pickup_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<PickupOrderRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn public_url_uses_memory_scheme() {
        let backend = MemoryBackend::new();
        assert_eq!(
            backend.public_url("waste-images", "waste-1.jpg"),
            "memory://waste-images/waste-1.jpg"
        );
    }

    #[tokio::test]
    async fn content_type_is_kept() {
        let backend = MemoryBackend::new();
        backend
            .upload("b", "k.png", vec![1, 2], UploadOptions::new("image/png"))
            .await
            .unwrap();
        assert_eq!(backend.content_type("b", "k.png").await.as_deref(), Some("image/png"));
        assert_eq!(backend.object_count().await, 1);
    }

    #[tokio::test]
    async fn ids_are_unique_across_tables() {
        let backend = MemoryBackend::new();
        let chat = backend
            .insert_chat_conversation(NewChatConversation {
                message: "hi".into(),
                response: "hello".into(),
                message_type: Some("general".into()),
            })
            .await
            .unwrap();
        let order = backend
            .insert_pickup_order(NewPickupOrder {
                waste_upload_id: None,
                status: OrderStatus::Pending,
                estimated_weight_grams: None,
                latitude: None,
                longitude: None,
                pickup_address: None,
                special_instructions: None,
            })
            .await
            .unwrap();
        assert_ne!(chat.id, order.id);
        assert_eq!(order.created_at, order.updated_at);
    }
}
