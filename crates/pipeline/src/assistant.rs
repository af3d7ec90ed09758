//! EcoBot chat: answer, tag the message type, keep a transcript row.

use std::sync::Arc;

use serde::Serialize;
use smartbin_classify::ClassificationClient;
use smartbin_core::MessageType;
use smartbin_storage::{ChatConversationRecord, NewChatConversation, RecordStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub message_type: MessageType,
    /// `model` or `fallback`.
    pub origin: &'static str,
    /// The stored transcript row; `None` if the insert failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ChatConversationRecord>,
}

pub struct Assistant {
    client: Arc<ClassificationClient>,
    records: Arc<dyn RecordStore>,
}

impl Assistant {
    pub fn new(client: Arc<ClassificationClient>, records: Arc<dyn RecordStore>) -> Self {
        Self { client, records }
    }

    pub async fn ask(&self, message: &str, context: Option<&str>) -> ChatReply {
        let message_type = MessageType::classify(message);
        let outcome = self.client.chat_tagged(message, context).await;
        let origin = outcome.origin();
        let response = outcome.into_value_or(
            smartbin_core::fallback_chat_response(message).to_string(),
        );

        let row = NewChatConversation {
            message: message.to_string(),
            response: response.clone(),
            message_type: Some(message_type.as_str().to_string()),
        };
        let conversation = match self.records.insert_chat_conversation(row).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "chat transcript not stored");
                None
            }
        };

        ChatReply {
            response,
            message_type,
            origin,
            conversation,
        }
    }
}
