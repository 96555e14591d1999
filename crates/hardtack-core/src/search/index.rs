//! Vector index collaborator interface

use super::FieldFilter;
use crate::error::Result;
use crate::recipe::Metadata;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Raw hit returned by a vector index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub score: f64,
    pub metadata: Metadata,
}

/// Queryable vector index
///
/// Implementations report transport or protocol failures as
/// `RetrievalUnavailable`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest neighbours of `embedding` satisfying `filters`, at most `top_k`
    async fn search(
        &self,
        embedding: &[f32],
        filters: &BTreeMap<String, FieldFilter>,
        top_k: usize,
    ) -> Result<Vec<IndexHit>>;

    /// Stored vector of a recipe, used when a query is derived from recipe context
    async fn vector_for(&self, recipe_id: &str) -> Result<Option<Vec<f32>>>;
}
