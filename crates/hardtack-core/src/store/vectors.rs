//! Vector storage and similarity search
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.

use super::RecipeStore;
use crate::error::{HardtackError, Result};
use crate::recipe::Recipe;
use crate::search::{FieldFilter, IndexHit, VectorIndex};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

impl RecipeStore {
    /// Stored embedding of a recipe
    pub fn get_embedding(&self, id: &str) -> Result<Option<Vec<f32>>> {
        let conn = self.conn()?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM recipe_vectors WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| bytes_to_embedding(&b)))
    }

    /// Nearest recipes to `embedding` whose metadata satisfies every filter
    ///
    /// Ordered by score descending then id, at most `top_k` hits.
    pub fn search_similar(
        &self,
        embedding: &[f32],
        filters: &BTreeMap<String, FieldFilter>,
        top_k: usize,
    ) -> Result<Vec<IndexHit>> {
        let rows: Vec<(String, String, Vec<u8>)> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT r.id, r.body, v.embedding
                 FROM recipes r
                 JOIN recipe_vectors v ON v.id = r.id",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut hits = Vec::new();
        for (id, body, bytes) in rows {
            let stored = bytes_to_embedding(&bytes);
            if stored.len() != embedding.len() {
                tracing::debug!(
                    "Skipping {}: {} dims, query has {}",
                    id,
                    stored.len(),
                    embedding.len()
                );
                continue;
            }
            let recipe: Recipe = serde_json::from_str(&body)?;
            let metadata = recipe.metadata();
            if !crate::search::matches_all(filters, &metadata) {
                continue;
            }
            hits.push(IndexHit {
                id,
                score: cosine_similarity(embedding, &stored) as f64,
                metadata,
            });
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[async_trait]
impl VectorIndex for RecipeStore {
    async fn search(
        &self,
        embedding: &[f32],
        filters: &BTreeMap<String, FieldFilter>,
        top_k: usize,
    ) -> Result<Vec<IndexHit>> {
        self.search_similar(embedding, filters, top_k)
            .map_err(|e| HardtackError::RetrievalUnavailable(e.to_string()))
    }

    async fn vector_for(&self, recipe_id: &str) -> Result<Option<Vec<f32>>> {
        self.get_embedding(recipe_id)
            .map_err(|e| HardtackError::RetrievalUnavailable(e.to_string()))
    }
}

/// Convert f32 embedding to bytes
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
