//! Retrieval and ranking pipeline
//!
//! Provides:
//! - Query planning (model-chosen field queries, inline filter fallback)
//! - Query building (embedding + filters + bounds)
//! - Vector retrieval against a `VectorIndex`
//! - Deterministic re-ranking with secondary signals
//! - Summaries of ranked results
//! - The recommendation engine composing the stages

mod filter;
mod index;
mod planner;
mod query;
mod rank;
mod recommend;
mod retriever;
mod summary;

pub(crate) use filter::matches_all;
pub use filter::{parse_inline_filters, CompareOp, FieldFilter};
pub use index::{IndexHit, VectorIndex};
pub use planner::{InlinePlanner, LlmQueryPlanner, QueryPlan, QueryPlanner};
pub use query::{request_preferences, QueryBuilder, QueryContext};
pub use rank::Ranker;
pub use recommend::RecommendationEngine;
pub use retriever::Retriever;
pub use summary::{summarize, summarize_one, Summary};

use crate::recipe::Metadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters of one vector query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// Query embedding, same length as the index vectors
    pub embedding: Vec<f32>,
    /// Hard filters keyed by metadata field
    pub filters: BTreeMap<String, FieldFilter>,
    /// Maximum number of candidates to return (>= 1)
    pub top_k: usize,
    /// Minimum cosine similarity, within [-1, 1]
    pub min_score: Option<f64>,
}

/// Unranked retrieval hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub recipe_id: String,
    /// Cosine similarity in [-1, 1]
    pub raw_score: f64,
    pub metadata: Metadata,
}

impl Candidate {
    /// Metadata value as a string, if present
    pub fn text(&self, field: &str) -> Option<&str> {
        self.metadata.get(field).and_then(|v| v.as_str())
    }

    /// Metadata value as a list of strings (empty when absent)
    pub fn strings(&self, field: &str) -> Vec<&str> {
        self.metadata
            .get(field)
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Candidate with its final score and 1-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub final_score: f64,
    pub rank: usize,
}

impl RankedResult {
    pub fn recipe_id(&self) -> &str {
        &self.candidate.recipe_id
    }
}
