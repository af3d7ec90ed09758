//! Storage seams for SmartBin deposits: a blob store for waste images and a
//! record store for uploads, chat exchanges and pickup orders.

pub mod conformance;
mod error;
mod memory;
mod record;
#[cfg(feature = "rest")]
mod rest;
mod traits;

pub use error::StorageError;
pub use memory::MemoryBackend;
pub use record::{
    ChatConversationRecord, NewChatConversation, NewPickupOrder, NewWasteUpload, OrderStatus,
    PickupOrderRecord, UploadOptions, WasteUploadRecord, CHAT_CONVERSATIONS_TABLE, ORDERS_TABLE,
    WASTE_UPLOADS_TABLE,
};
#[cfg(feature = "rest")]
pub use rest::{RestBackend, RestConfig};
pub use traits::{BlobStore, RecordStore};
