// Recommending from a small in-memory collection using hardtack as a library

use hardtack_core::{
    HashingEmbedder, QueryContext, Recipe, RecipeStore, RecommendationEngine, SearchConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> hardtack_core::Result<()> {
    let store = Arc::new(RecipeStore::open_in_memory()?);
    let embedder = Arc::new(HashingEmbedder::default());

    let recipes = [
        ("r1", "Vegan Chocolate Cake", &["vegan", "dessert"][..]),
        ("r2", "Lemon Tart", &["dessert"][..]),
        ("r3", "Weeknight Dal", &["vegan", "dinner"][..]),
    ];
    for (id, dish, tags) in recipes {
        let recipe = Recipe {
            id: id.to_string(),
            dish_name: dish.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        let embedding = embedder.embed_text(&recipe.embedding_text());
        store.insert_recipe(&recipe, "feature-hashing", &embedding)?;
    }
    println!("Stored {} recipes", store.get_stats()?.recipe_count);

    let engine = RecommendationEngine::new(embedder, store, SearchConfig::default());
    for request in ["something chocolatey", "dinner tag:vegan"] {
        let context = QueryContext::default();
        for result in engine.search(request, &context).await? {
            println!("  {:.3}  {}", result.final_score, result.recipe_id());
        }
        let summary = engine.recommend(request, &context).await?;
        println!("{}\n  -> {}\n", request, summary.text);
    }

    Ok(())
}
