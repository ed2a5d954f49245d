//! Language-model access for VendorRisk.
//!
//! - [`ChatModel`] / [`OpenAiChat`] — chat completions against an OpenAI-compatible API
//! - [`Embedder`] / [`OpenAiEmbedder`] — text embeddings for the vector index
//! - [`complete_json`] — coerces model output into JSON with a bounded repair retry

pub mod chat;
pub mod embed;
pub mod json;

pub use chat::{ChatModel, OpenAiChat};
pub use embed::{Embedder, OpenAiEmbedder};
pub use json::{JsonOptions, complete_json, extract_json_block};
