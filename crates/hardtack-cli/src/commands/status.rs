//! Status command

use crate::app::OutputFormat;
use crate::services::Services;
use anyhow::Result;

pub async fn run(services: &Services, format: OutputFormat) -> Result<()> {
    let stats = services.store.get_stats()?;
    let recipes = services.store.list_recipes()?;
    let llm = &services.config.llm_service;

    match format {
        OutputFormat::Json => {
            let recipes: Vec<serde_json::Value> = recipes
                .iter()
                .map(|(id, dish_name)| serde_json::json!({"id": id, "dish_name": dish_name}))
                .collect();
            let status = serde_json::json!({
                "database": services.db_path,
                "mirror_dir": services.mirror.dir(),
                "import_dir": services.imports.root(),
                "recipe_count": stats.recipe_count,
                "embedded_count": stats.embedded_count,
                "models": stats.models,
                "embedder": services.embedder.model_name(),
                "chat_model": llm.model,
                "llm_url": llm.url,
                "recipes": recipes,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Cli => {
            println!("Database:        {}", services.db_path.display());
            println!("Mirror:          {}", services.mirror.dir().display());
            println!("Imports:         {}", services.imports.root().display());
            println!();
            println!("Recipes:         {}", stats.recipe_count);
            println!("Embedded:        {}", stats.embedded_count);
            if !stats.models.is_empty() {
                println!("Models:          {}", stats.models.join(", "));
            }
            println!();
            println!("Embedder:        {}", services.embedder.model_name());
            println!("Chat model:      {} ({})", llm.model, llm.url);
            if !recipes.is_empty() {
                println!();
                for (id, dish_name) in &recipes {
                    println!("  #{}  {}", id, dish_name);
                }
            }
        }
    }
    Ok(())
}
