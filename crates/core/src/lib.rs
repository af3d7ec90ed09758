//! SmartBin core: domain types, classification-response parsing, chat
//! fallbacks and the deterministic reward function.
//!
//! Nothing in this crate performs I/O. The classification client, the
//! storage backends and the deposit pipeline build on these types.

pub mod chat;
pub mod outcome;
pub mod parse;
pub mod reward;
pub mod types;

pub use chat::{fallback_chat_response, MessageType};
pub use outcome::{FallbackReason, Outcome};
pub use parse::{fallback_classification, parse_classification, ParseTier};
pub use reward::{
    compute_coins, eco_points_for, MeasureError, Measurement, MeasurementSource, RandomizedMeasurer,
    RewardRecord, SampleMeasurer, ScaleMeasurer, UserSuppliedMeasurer, WeighingScale, WeightUnit,
};
pub use types::{ClassificationResult, EncodedImage, WasteSample};
