//! Query building: request text + context -> QueryParams

use super::filter::parse_inline_filters;
use super::{FieldFilter, QueryParams, VectorIndex};
use crate::config::SearchConfig;
use crate::error::{HardtackError, Result};
use crate::llm::Embedder;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Structured context accompanying a request
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Recipe the user is looking at; its vector stands in for empty text
    pub recipe_id: Option<String>,
    /// Explicit filters, overriding inline ones on the same field
    pub filters: BTreeMap<String, FieldFilter>,
    /// Requested result count
    pub top_k: Option<usize>,
    /// Minimum similarity threshold
    pub min_score: Option<f64>,
    /// Soft field/value preferences that earn a ranking bonus
    pub preferences: Vec<(String, Value)>,
}

impl QueryContext {
    pub fn with_recipe(mut self, recipe_id: impl Into<String>) -> Self {
        self.recipe_id = Some(recipe_id.into());
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, filter: FieldFilter) -> Self {
        self.filters.insert(field.into(), filter);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_preference(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.preferences.push((field.into(), value.into()));
        self
    }
}

/// Soft preferences implied by the request's free text
///
/// Each distinct word of three or more letters may match a recipe tag.
/// Inline filter terms are hard filters and are not repeated here.
pub fn request_preferences(request_text: &str) -> Vec<(String, Value)> {
    let (text, _) = parse_inline_filters(request_text);
    let mut seen = BTreeSet::new();
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| word.chars().count() >= 3 && seen.insert(word.clone()))
        .map(|word| ("tags".to_string(), Value::String(word)))
        .collect()
}

/// Builds vector queries from free text
pub struct QueryBuilder {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: SearchConfig,
}

impl QueryBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, config: SearchConfig) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Build query parameters for a request
    pub async fn build(&self, request_text: &str, context: &QueryContext) -> Result<QueryParams> {
        let top_k = self.resolve_top_k(context.top_k)?;
        let min_score = validate_min_score(context.min_score)?;

        let (text, mut filters) = parse_inline_filters(request_text);
        filters.extend(context.filters.clone());

        let embedding = if !text.trim().is_empty() {
            let embedding = self
                .embedder
                .embed(text.trim())
                .await
                .map_err(|e| match e {
                    HardtackError::EmbeddingUnavailable(_) => e,
                    other => HardtackError::EmbeddingUnavailable(other.to_string()),
                })?;
            if embedding.is_empty() {
                return Err(HardtackError::EmbeddingUnavailable(
                    "embedder returned an empty vector".to_string(),
                ));
            }
            embedding
        } else if let Some(ref recipe_id) = context.recipe_id {
            self.index
                .vector_for(recipe_id)
                .await?
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    HardtackError::InvalidQuery(format!(
                        "request is empty and recipe {} has no stored vector",
                        recipe_id
                    ))
                })?
        } else {
            return Err(HardtackError::InvalidQuery(
                "request text is empty".to_string(),
            ));
        };

        tracing::debug!(
            "Built query: {} dims, {} filters, top_k={}, min_score={:?}",
            embedding.len(),
            filters.len(),
            top_k,
            min_score
        );

        Ok(QueryParams {
            embedding,
            filters,
            top_k,
            min_score,
        })
    }

    fn resolve_top_k(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.config.default_top_k.min(self.config.max_top_k)),
            Some(0) => Err(HardtackError::InvalidQuery(
                "top_k must be positive".to_string(),
            )),
            Some(k) => Ok(k.min(self.config.max_top_k)),
        }
    }
}

fn validate_min_score(min_score: Option<f64>) -> Result<Option<f64>> {
    match min_score {
        Some(score) if !score.is_finite() || !(-1.0..=1.0).contains(&score) => {
            Err(HardtackError::InvalidQuery(format!(
                "min_score {} is outside the similarity range [-1, 1]",
                score
            )))
        }
        other => Ok(other),
    }
}
