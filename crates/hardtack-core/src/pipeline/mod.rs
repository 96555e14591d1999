//! Recipe processing pipeline
//!
//! Acquisition -> markup stripping -> extraction -> embedding -> persistence.

mod extract;
mod fetch;

pub use extract::{clean_html_text, LlmRecipeExtractor, RecipeExtractor};
pub use fetch::{ContentFetcher, HttpFetcher, ImportDir, Source};

use crate::error::{HardtackError, Result};
use crate::llm::Embedder;
use crate::recipe::Recipe;
use crate::store::{RecipeMirror, RecipeRepository};
use chrono::Local;
use std::sync::Arc;

/// Length of generated recipe ids, in hex characters
const RECIPE_ID_LEN: usize = 16;

/// Adds new recipes from web pages or saved HTML files
pub struct ProcessingPipeline {
    fetcher: Arc<dyn ContentFetcher>,
    extractor: Arc<dyn RecipeExtractor>,
    embedder: Arc<dyn Embedder>,
    repository: Arc<dyn RecipeRepository>,
    mirror: Arc<dyn RecipeMirror>,
}

impl ProcessingPipeline {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        extractor: Arc<dyn RecipeExtractor>,
        embedder: Arc<dyn Embedder>,
        repository: Arc<dyn RecipeRepository>,
        mirror: Arc<dyn RecipeMirror>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            embedder,
            repository,
            mirror,
        }
    }

    /// Process one source and store the resulting recipe
    pub async fn run(&self, source: &Source) -> Result<Recipe> {
        let raw = self.fetcher.fetch(source).await?;
        let text = clean_html_text(&raw);
        if text.is_empty() {
            return Err(HardtackError::ExternalError(format!(
                "{} has no readable text",
                source.location()
            )));
        }
        tracing::debug!("Cleaned page text: {} chars", text.len());

        let mut recipe = self.extractor.extract(&text).await?;
        recipe.id = recipe_id(&source.location(), &recipe.dish_name);
        recipe.date_added = Some(Local::now().format("%Y-%m-%d").to_string());
        if let Source::Url(url) = source {
            recipe.source_url = Some(url.clone());
        }

        let embedding = self.embedder.embed(&recipe.embedding_text()).await?;
        if embedding.is_empty() {
            return Err(HardtackError::EmbeddingUnavailable(
                "embedder returned an empty vector".to_string(),
            ));
        }
        self.repository
            .insert(&recipe, self.embedder.model_name(), &embedding)
            .await?;

        if let Err(e) = self.mirror.write(&recipe).await {
            tracing::warn!("Failed to mirror recipe {}: {}", recipe.id, e);
        }

        tracing::info!("Added recipe {} ({})", recipe.id, recipe.dish_name);
        Ok(recipe)
    }
}

/// Stable id derived from where a recipe came from and its name
pub fn recipe_id(location: &str, dish_name: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(location.as_bytes());
    hasher.update(b"\n");
    hasher.update(dish_name.trim().to_lowercase().as_bytes());
    hasher.finalize().to_hex()[..RECIPE_ID_LEN].to_string()
}
