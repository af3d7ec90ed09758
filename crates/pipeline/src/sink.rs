//! Where deposit results and user-facing notices go.

use std::sync::Mutex;

use serde::Serialize;
use smartbin_core::{ClassificationResult, RewardRecord};
use smartbin_storage::WasteUploadRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Everything the pipeline tells its caller, in the order it happens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Classified {
        result: ClassificationResult,
        /// `model` or `fallback`.
        origin: &'static str,
    },
    Persisted {
        record: WasteUploadRecord,
    },
    Rewarded {
        reward: RewardRecord,
    },
    Notice(Notification),
}

/// Receives pipeline events.
pub trait ResultSink: Send + Sync {
    fn deliver(&self, event: SinkEvent);
}

/// Keeps every event, for tests and for building HTTP responses.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl ResultSink for CollectingSink {
    fn deliver(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event);
    }
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn deliver(&self, event: SinkEvent) {
        match event {
            SinkEvent::Classified { result, origin } => tracing::info!(
                waste_type = %result.waste_type,
                classification = %result.classification,
                origin,
                "sample classified"
            ),
            SinkEvent::Persisted { record } => {
                tracing::info!(id = %record.id, url = %record.image_url, "sample stored")
            }
            SinkEvent::Rewarded { reward } => tracing::info!(
                coins = reward.coins_awarded,
                eco_points = reward.eco_points,
                "reward computed"
            ),
            SinkEvent::Notice(n) => match n.severity {
                Severity::Info => tracing::info!("{}", n.message),
                Severity::Warning => tracing::warn!("{}", n.message),
                Severity::Error => tracing::error!("{}", n.message),
            },
        }
    }
}
