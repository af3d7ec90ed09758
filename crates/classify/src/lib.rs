//! Waste classification and assistant chat against a multimodal
//! inference endpoint.
//!
//! - [`InferenceClient`] is the transport seam; [`GeminiClient`] is the
//!   production implementation.
//! - [`ClassificationClient`] owns the prompts, the two-tier response
//!   parsing and the fallbacks.

pub mod client;
pub mod gemini;
pub mod inference;
pub mod prompt;

pub use client::{ClassificationClient, Classified};
pub use gemini::{GeminiClient, GeminiConfig};
pub use inference::{InferenceClient, InferenceError, InferenceRequest, Part};
