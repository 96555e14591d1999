//! Local JSON mirror: one `<id>.json` file per recipe

use super::RecipeMirror;
use crate::error::{HardtackError, Result};
use crate::recipe::Recipe;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Directory of pretty-printed recipe files
#[derive(Debug, Clone)]
pub struct JsonMirror {
    dir: PathBuf,
}

impl JsonMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file mirroring a recipe
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Read a mirrored recipe
    pub fn read(&self, id: &str) -> Result<Recipe> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(HardtackError::RecipeNotFound(id.to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_file(&self, recipe: &Recipe) -> Result<()> {
        if recipe.id.is_empty() || recipe.id.contains(['/', '\\']) || recipe.id.starts_with('.') {
            return Err(HardtackError::InvalidInput(format!(
                "recipe id '{}' cannot name a mirror file",
                recipe.id
            )));
        }
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(recipe)?;
        std::fs::write(self.path_for(&recipe.id), content)?;
        Ok(())
    }
}

#[async_trait]
impl RecipeMirror for JsonMirror {
    async fn write(&self, recipe: &Recipe) -> Result<()> {
        self.write_file(recipe)
    }
}
