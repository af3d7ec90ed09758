//! Assistant fallbacks and message tagging for the EcoBot chat.

use serde::{Deserialize, Serialize};

const PLASTIC_REPLY: &str = "I can help you with plastic recycling! Different types of plastic have different recycling codes (1-7). PET bottles (#1) and HDPE containers (#2) are commonly recyclable. Always clean containers before recycling.";
const PICKUP_REPLY: &str = "For waste pickup orders, I can help you track status and provide updates. Make sure to have your waste properly sorted and accessible for our pickup team.";
const RECYCLE_REPLY: &str = "Recycling is crucial for environmental sustainability! The key is proper sorting: clean containers, separate materials, and follow local guidelines. Every item recycled helps reduce landfill waste.";
const GREETING_REPLY: &str = "Hello! I'm EcoBot, your waste management assistant. I can help you with recycling questions, waste classification, pickup scheduling, and environmental tips. How can I assist you today?";

/// Canned reply for when the inference endpoint cannot answer.
///
/// Checked in order: `plastic`, then `pickup`/`order`, then `recycle`.
pub fn fallback_chat_response(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("plastic") {
        PLASTIC_REPLY
    } else if lower.contains("pickup") || lower.contains("order") {
        PICKUP_REPLY
    } else if lower.contains("recycle") {
        RECYCLE_REPLY
    } else {
        GREETING_REPLY
    }
}

/// Topic tag stored alongside each chat exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    General,
    Analysis,
    Order,
    Tip,
}

impl MessageType {
    /// Tag a user message by keyword.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["order", "pickup", "track"]) {
            MessageType::Order
        } else if has(&["analyze", "identify", "classify"]) {
            MessageType::Analysis
        } else if has(&["tip", "advice", "help"]) {
            MessageType::Tip
        } else {
            MessageType::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::General => "general",
            MessageType::Analysis => "analysis",
            MessageType::Order => "order",
            MessageType::Tip => "tip",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
