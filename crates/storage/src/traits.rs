use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{
    ChatConversationRecord, NewChatConversation, NewPickupOrder, NewWasteUpload, OrderStatus,
    PickupOrderRecord, UploadOptions, WasteUploadRecord,
};

/// Object storage for raw waste images.
///
/// Keys are caller-generated. With `upsert: false` an existing key is a
/// conflict (`StorageError::AlreadyExists`), never a silent overwrite.
///
/// Implementations must be `Send + Sync + 'static` to live in axum
/// application state and cross async task boundaries.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store `bytes` under `bucket/key`.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<(), StorageError>;

    /// Read an object back.
    ///
    /// Returns `Err(StorageError::ObjectNotFound)` if nothing is stored under the key.
    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Public URL for an object. Pure string construction; does not check existence.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Relational storage for uploads, chat exchanges and pickup orders.
///
/// Every insert returns the row as stored, including generated `id` and
/// timestamp columns. Rows are append-only here; nothing updates or
/// deletes them.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    // ── Waste uploads ────────────────────────────────────────────────────────

    /// Insert a `waste_uploads` row.
    async fn insert_waste_upload(
        &self,
        row: NewWasteUpload,
    ) -> Result<WasteUploadRecord, StorageError>;

    /// Most recent uploads first. `limit` of 0 means no limit.
    async fn list_waste_uploads(&self, limit: usize)
        -> Result<Vec<WasteUploadRecord>, StorageError>;

    // ── Chat ─────────────────────────────────────────────────────────────────

    /// Insert a `chatbot_conversations` row.
    async fn insert_chat_conversation(
        &self,
        row: NewChatConversation,
    ) -> Result<ChatConversationRecord, StorageError>;

    // ── Orders ───────────────────────────────────────────────────────────────

    /// Insert an `orders` row.
    ///
    /// Returns `Err(StorageError::RecordNotFound)` if `waste_upload_id` is set
    /// and does not reference an existing upload.
    async fn insert_pickup_order(
        &self,
        row: NewPickupOrder,
    ) -> Result<PickupOrderRecord, StorageError>;

    /// Orders, newest first, optionally filtered by status.
    async fn list_pickup_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<PickupOrderRecord>, StorageError>;
}
