//! LLM integration
//!
//! Provides traits and implementations for:
//! - Embedding generation via external services (vLLM, OpenAI, etc.)
//! - An offline feature-hashing embedder
//! - Chat completions used by the agent and the recipe extractor

mod cache;
mod client;
mod hashing_embedder;
mod http_embedder;
mod traits;

pub use client::{extract_json_object, ChatMessage, LLMClient, MetricsSnapshot, VLLMClient};
pub use hashing_embedder::{HashingEmbedder, DEFAULT_HASHING_DIMS};
pub use http_embedder::HttpEmbedder;
pub use traits::*;
