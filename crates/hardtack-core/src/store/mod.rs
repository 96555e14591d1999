//! Recipe persistence
//!
//! Provides:
//! - A SQLite store holding recipe records and their embeddings
//! - Cosine similarity search over stored vectors (the `VectorIndex` used at query time)
//! - A local JSON mirror of each record

mod mirror;
mod recipes;
mod schema;
mod vectors;

pub use mirror::JsonMirror;
pub use recipes::StoreStats;
pub use schema::RecipeStore;
pub use vectors::{bytes_to_embedding, cosine_similarity, embedding_to_bytes};

use crate::error::Result;
use crate::recipe::Recipe;
use async_trait::async_trait;
use serde_json::Value;

/// Authoritative recipe records
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Recipe>>;

    /// Insert or replace a recipe together with its embedding
    async fn insert(&self, recipe: &Recipe, model: &str, embedding: &[f32]) -> Result<()>;

    /// Change one existing field and replace the embedding atomically
    ///
    /// Unknown recipes are `RecipeNotFound`; a failed write leaves the
    /// record and its vector as they were.
    async fn update(
        &self,
        id: &str,
        field: &str,
        value: &Value,
        model: &str,
        embedding: &[f32],
    ) -> Result<Recipe>;
}

/// Secondary copy of recipe records
#[async_trait]
pub trait RecipeMirror: Send + Sync {
    /// Create or overwrite the copy of a recipe
    async fn write(&self, recipe: &Recipe) -> Result<()>;
}
