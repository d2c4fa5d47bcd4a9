//! Transport-only client primitives for Groq's OpenAI-compatible chat
//! completions endpoint.
//!
//! This crate owns request building, error-body parsing, and cooperative
//! cancellation of a single non-streaming completion call. It contains no
//! scheduling or single-flight logic and no retry policy: a failed call is
//! reported once and left to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod models;
pub mod payload;
pub mod url;

pub use client::{CancellationSignal, GroqApiClient};
pub use config::GroqApiConfig;
pub use error::GroqApiError;
pub use models::{ModelPreset, ModelTier, MODEL_PRESETS};
pub use payload::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
pub use url::normalize_chat_completions_url;
