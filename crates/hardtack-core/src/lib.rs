//! Hardtack Core Library
//!
//! Core functionality for the hardtack recipe assistant.
//!
//! # Features
//! - Tool-call parsing and dispatch over a closed function registry
//! - Vector retrieval of saved recipes with deterministic re-ranking
//! - Recommendation summaries that cite the recipes they describe
//! - A processing pipeline adding recipes from web pages or HTML files
//! - SQLite storage with a local JSON mirror

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod recipe;
pub mod search;
pub mod store;
pub mod stream;

#[cfg(test)]
mod testing;

pub use agent::{
    default_registry, encode_tool_call, parse_tool_call, Agent, AgentReply, Dispatcher,
    FailureReport, ParsedCall, ToolCall, ToolDefinition, ToolOutput, ToolRegistry, ToolServices,
};
pub use config::{Config, LLMServiceConfig, RankingWeights, RetryPolicy, SearchConfig};
pub use error::{HardtackError, Result};
pub use llm::{
    ChatMessage, Embedder, HashingEmbedder, HttpEmbedder, LLMClient, MetricsSnapshot, VLLMClient,
};
pub use pipeline::{
    ContentFetcher, HttpFetcher, ImportDir, LlmRecipeExtractor, ProcessingPipeline, RecipeExtractor,
    Source,
};
pub use recipe::Recipe;
pub use search::{
    QueryContext, QueryParams, RankedResult, Ranker, RecommendationEngine, Summary, VectorIndex,
};
pub use store::{JsonMirror, RecipeMirror, RecipeRepository, RecipeStore, StoreStats};
pub use stream::stream_words;

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "hardtack";

/// Default data directory name
pub const DATA_DIR_NAME: &str = "hardtack";
