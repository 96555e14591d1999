//! Vector retrieval stage

use super::{Candidate, QueryParams, VectorIndex};
use crate::error::{HardtackError, Result};
use std::sync::Arc;

/// Executes one query against the vector index
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Fetch candidates for a query
    ///
    /// At most `top_k` candidates are returned, none scoring below
    /// `min_score`. Order is unspecified.
    pub async fn retrieve(&self, params: &QueryParams) -> Result<Vec<Candidate>> {
        let hits = self
            .index
            .search(&params.embedding, &params.filters, params.top_k)
            .await
            .map_err(|e| match e {
                HardtackError::RetrievalUnavailable(_) => e,
                other => HardtackError::RetrievalUnavailable(other.to_string()),
            })?;

        let total = hits.len();
        let candidates: Vec<Candidate> = hits
            .into_iter()
            .filter(|hit| hit.score.is_finite())
            .filter(|hit| params.min_score.map_or(true, |min| hit.score >= min))
            .take(params.top_k)
            .map(|hit| Candidate {
                recipe_id: hit.id,
                raw_score: hit.score,
                metadata: hit.metadata,
            })
            .collect();

        tracing::debug!(
            "Retrieved {} candidates ({} hits from index)",
            candidates.len(),
            total
        );

        Ok(candidates)
    }
}
