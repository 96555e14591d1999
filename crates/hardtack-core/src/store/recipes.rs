//! Recipe record operations

use super::{RecipeRepository, RecipeStore};
use crate::error::{HardtackError, Result};
use crate::recipe::Recipe;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub recipe_count: usize,
    pub embedded_count: usize,
    /// Embedding models present in the store
    pub models: Vec<String>,
}

impl RecipeStore {
    /// Insert a recipe together with its embedding
    pub fn insert_recipe(&self, recipe: &Recipe, model: &str, embedding: &[f32]) -> Result<()> {
        if recipe.id.is_empty() {
            return Err(HardtackError::InvalidInput("recipe id is empty".to_string()));
        }
        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(recipe)?;
        let bytes = super::embedding_to_bytes(embedding);

        let conn = self.conn()?;
        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            conn.execute(
                "INSERT INTO recipes (id, dish_name, body, created_at, modified_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    dish_name = excluded.dish_name,
                    body = excluded.body,
                    modified_at = excluded.modified_at",
                params![recipe.id, recipe.dish_name, body, now],
            )?;
            conn.execute(
                "INSERT OR REPLACE INTO recipe_vectors (id, model, embedding) VALUES (?1, ?2, ?3)",
                params![recipe.id, model, bytes],
            )?;
            Ok(())
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Fetch a recipe by id
    pub fn get_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM recipes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str(&b).map_err(HardtackError::from))
            .transpose()
    }

    /// Change one field of a stored recipe and replace its embedding
    ///
    /// Read, field update and vector write happen under one connection guard
    /// inside a single `BEGIN IMMEDIATE` transaction; on any error nothing
    /// is written.
    pub fn update_recipe(
        &self,
        id: &str,
        field: &str,
        value: &Value,
        model: &str,
        embedding: &[f32],
    ) -> Result<Recipe> {
        let bytes = super::embedding_to_bytes(embedding);

        let conn = self.conn()?;
        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<Recipe> {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM recipes WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let mut recipe: Recipe = match body {
                Some(body) => serde_json::from_str(&body)?,
                None => return Err(HardtackError::RecipeNotFound(id.to_string())),
            };
            recipe.apply_update(field, value)?;

            conn.execute(
                "UPDATE recipes SET dish_name = ?2, body = ?3, modified_at = ?4 WHERE id = ?1",
                params![
                    id,
                    recipe.dish_name,
                    serde_json::to_string(&recipe)?,
                    Utc::now().to_rfc3339()
                ],
            )?;
            conn.execute(
                "INSERT OR REPLACE INTO recipe_vectors (id, model, embedding) VALUES (?1, ?2, ?3)",
                params![id, model, bytes],
            )?;
            Ok(recipe)
        })();

        let result = result.and_then(|recipe| {
            conn.execute("COMMIT", [])?;
            Ok(recipe)
        });
        match &result {
            Ok(_) => tracing::debug!("Updated field '{}' of recipe {}", field, id),
            Err(e) => {
                tracing::debug!("Rolling back update of recipe {}: {}", id, e);
                let _ = conn.execute("ROLLBACK", []);
            }
        }
        result
    }

    /// All recipe ids with their dish names, ordered by dish name
    pub fn list_recipes(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, dish_name FROM recipes ORDER BY dish_name, id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get store statistics
    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let recipe_count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        let embedded_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM recipe_vectors", [], |row| row.get(0))?;
        let mut stmt = conn.prepare("SELECT DISTINCT model FROM recipe_vectors ORDER BY model")?;
        let models = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(StoreStats {
            recipe_count: recipe_count as usize,
            embedded_count: embedded_count as usize,
            models,
        })
    }
}

#[async_trait]
impl RecipeRepository for RecipeStore {
    async fn get(&self, id: &str) -> Result<Option<Recipe>> {
        self.get_recipe(id)
    }

    async fn insert(&self, recipe: &Recipe, model: &str, embedding: &[f32]) -> Result<()> {
        self.insert_recipe(recipe, model, embedding)
    }

    async fn update(
        &self,
        id: &str,
        field: &str,
        value: &Value,
        model: &str,
        embedding: &[f32],
    ) -> Result<Recipe> {
        self.update_recipe(id, field, value, model, embedding)
    }
}
