use serde::{Deserialize, Serialize};

/// Table holding one row per stored waste image.
pub const WASTE_UPLOADS_TABLE: &str = "waste_uploads";
/// Table holding assistant exchanges.
pub const CHAT_CONVERSATIONS_TABLE: &str = "chatbot_conversations";
/// Table holding pickup orders.
pub const ORDERS_TABLE: &str = "orders";

/// Options for a blob upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    /// Overwrite an existing object instead of failing.
    pub upsert: bool,
}

impl UploadOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            upsert: false,
        }
    }
}

/// Insert payload for `waste_uploads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWasteUpload {
    pub image_url: String,
    pub image_path: String,
    /// Full classification object as returned to the user.
    #[serde(rename = "gemini_analysis")]
    pub analysis: serde_json::Value,
    pub waste_type: Option<String>,
    pub classification: Option<String>,
    #[serde(rename = "waste_weight_grams")]
    pub weight_grams: Option<f64>,
    #[serde(rename = "pickup_location_lat")]
    pub pickup_lat: Option<f64>,
    #[serde(rename = "pickup_location_lng")]
    pub pickup_lng: Option<f64>,
}

/// A stored `waste_uploads` row. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteUploadRecord {
    pub id: String,
    pub image_url: String,
    pub image_path: String,
    #[serde(rename = "gemini_analysis")]
    pub analysis: serde_json::Value,
    pub waste_type: Option<String>,
    pub classification: Option<String>,
    #[serde(rename = "waste_weight_grams")]
    pub weight_grams: Option<f64>,
    #[serde(rename = "pickup_location_lat")]
    pub pickup_lat: Option<f64>,
    #[serde(rename = "pickup_location_lng")]
    pub pickup_lng: Option<f64>,
    /// RFC 3339 timestamp string.
    pub uploaded_at: String,
}

impl WasteUploadRecord {
    pub fn from_new(id: String, uploaded_at: String, row: NewWasteUpload) -> Self {
        Self {
            id,
            image_url: row.image_url,
            image_path: row.image_path,
            analysis: row.analysis,
            waste_type: row.waste_type,
            classification: row.classification,
            weight_grams: row.weight_grams,
            pickup_lat: row.pickup_lat,
            pickup_lng: row.pickup_lng,
            uploaded_at,
        }
    }
}

/// Insert payload for `chatbot_conversations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChatConversation {
    pub message: String,
    pub response: String,
    pub message_type: Option<String>,
}

/// A stored assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConversationRecord {
    pub id: String,
    pub message: String,
    pub response: String,
    pub message_type: Option<String>,
    /// RFC 3339 timestamp string.
    pub created_at: String,
}

/// Lifecycle of a pickup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "in_progress" => Ok(OrderStatus::InProgress),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insert payload for `orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPickupOrder {
    /// FK to `waste_uploads.id`.
    pub waste_upload_id: Option<String>,
    pub status: OrderStatus,
    #[serde(rename = "estimated_weight")]
    pub estimated_weight_grams: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pickup_address: Option<String>,
    pub special_instructions: Option<String>,
}

/// A stored pickup order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupOrderRecord {
    pub id: String,
    pub waste_upload_id: Option<String>,
    pub status: OrderStatus,
    #[serde(rename = "estimated_weight")]
    pub estimated_weight_grams: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pickup_address: Option<String>,
    pub special_instructions: Option<String>,
    /// RFC 3339 timestamp string.
    pub created_at: String,
    /// RFC 3339 timestamp string.
    pub updated_at: String,
}
