//! Integration tests for the agent over a real store
//!
//! Uses the offline feature-hashing embedder and a temporary SQLite store,
//! so no external services are needed.

use async_trait::async_trait;
use hardtack_core::agent::{Dispatcher, SHOW_RECIPE_MESSAGE};
use hardtack_core::pipeline::{ContentFetcher, RecipeExtractor};
use hardtack_core::{
    default_registry, Agent, AgentReply, ChatMessage, Embedder, HashingEmbedder, ImportDir,
    JsonMirror, LLMClient, ProcessingPipeline, Recipe, RecipeMirror, RecipeStore, RecommendationEngine,
    Result, RetryPolicy, SearchConfig, Source, ToolServices,
};
use std::sync::Arc;
use tempfile::TempDir;

struct NoopClient;

#[async_trait]
impl LLMClient for NoopClient {
    async fn chat_completion(&self, _messages: Vec<ChatMessage>, _temperature: f32) -> Result<String> {
        Ok("Happy cooking!".to_string())
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(Vec::new())
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(Vec::new())
    }

    fn embedding_dimensions(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "noop"
    }

    fn embedding_model(&self) -> &str {
        "noop"
    }
}

struct FixedPage;

#[async_trait]
impl ContentFetcher for FixedPage {
    async fn fetch(&self, _source: &Source) -> Result<String> {
        Ok("<h1>Miso Soup</h1>".to_string())
    }
}

struct MisoExtractor;

#[async_trait]
impl RecipeExtractor for MisoExtractor {
    async fn extract(&self, _text: &str) -> Result<Recipe> {
        Ok(Recipe {
            dish_name: "Miso Soup".into(),
            tags: vec!["soup".into(), "japanese".into()],
            ..Default::default()
        })
    }
}

fn recipe(id: &str, dish: &str, tags: &[&str], rating: Option<f64>) -> Recipe {
    Recipe {
        id: id.to_string(),
        dish_name: dish.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        user_rating: rating,
        date_added: Some("2024-03-01".into()),
        ..Default::default()
    }
}

async fn setup() -> (Agent, Arc<RecipeStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RecipeStore::open(&dir.path().join("recipes.sqlite")).unwrap());
    let mirror = Arc::new(JsonMirror::new(dir.path().join("json")));
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
    let imports = dir.path().join("imports");
    std::fs::create_dir_all(&imports).unwrap();
    std::fs::write(imports.join("miso.html"), "<h1>Miso Soup</h1>").unwrap();

    for r in [
        recipe("choc", "Vegan Chocolate Mousse", &["dessert", "vegan", "chocolate"], Some(4.5)),
        recipe("tart", "Lemon Tart", &["dessert", "citrus"], None),
        recipe("stew", "Beef Stew", &["dinner", "winter", "comfort"], Some(3.0)),
        recipe("chili", "Three Bean Chili", &["dinner", "vegan", "spicy"], None),
    ] {
        let embedding = embedder.embed(&r.embedding_text()).await.unwrap();
        store
            .insert_recipe(&r, embedder.model_name(), &embedding)
            .unwrap();
        mirror.write(&r).await.unwrap();
    }

    let engine = Arc::new(
        RecommendationEngine::new(embedder.clone(), store.clone(), SearchConfig::default())
            .with_retry(RetryPolicy::none()),
    );
    let pipeline = Arc::new(ProcessingPipeline::new(
        Arc::new(FixedPage),
        Arc::new(MisoExtractor),
        embedder.clone(),
        store.clone(),
        mirror.clone(),
    ));
    let registry = default_registry(ToolServices {
        engine,
        repository: store.clone(),
        mirror,
        embedder,
        pipeline,
        imports: Some(ImportDir::new(imports)),
    })
    .unwrap();

    let agent = Agent::new(Arc::new(NoopClient), Dispatcher::new(Arc::new(registry)));
    (agent, store, dir)
}

#[tokio::test]
async fn test_plain_text_is_conversation() {
    let (agent, _store, _dir) = setup().await;
    let reply = agent.respond("find me a vegan dessert").await;
    assert!(matches!(reply, AgentReply::Conversation { ref text } if text == "find me a vegan dessert"));
}

#[tokio::test]
async fn test_recommendation_respects_inline_filters() {
    let (agent, _store, _dir) = setup().await;
    let reply = agent
        .respond(
            r#"One moment.
```json
{"function_name": "run_recommendation_engine", "arguments": {"user_desire": "something sweet tag:vegan"}}
```"#,
        )
        .await;

    let AgentReply::Tool { output, .. } = reply else {
        panic!("expected a tool reply");
    };
    let summary = output.summary.expect("summary");
    assert_eq!(summary.cited_recipe_ids.len(), 2);
    assert!(summary.cited_recipe_ids.contains(&"choc".to_string()));
    assert!(summary.cited_recipe_ids.contains(&"chili".to_string()));
    for id in &summary.cited_recipe_ids {
        assert!(summary.text.contains(match id.as_str() {
            "choc" => "Vegan Chocolate Mousse",
            _ => "Three Bean Chili",
        }));
    }
}

#[tokio::test]
async fn test_uncooked_filter_with_no_match_says_so() {
    let (agent, _store, _dir) = setup().await;
    let reply = agent
        .respond(r#"{"function_name": "find_single_recipe", "arguments": {"user_desire": "stew rating:>=5"}}"#)
        .await;
    assert_eq!(reply.text(), "I couldn't find any recipes matching that.");
}

#[tokio::test]
async fn test_show_then_edit_then_show() {
    let (agent, store, dir) = setup().await;

    let reply = agent
        .respond(r#"{"function_name": "show_recipe", "arguments": {"recipe_id": "stew"}}"#)
        .await;
    assert_eq!(reply.text(), SHOW_RECIPE_MESSAGE);

    let reply = agent
        .respond(r#"{"function_name": "edit_recipe", "arguments": {"recipe_id": "stew", "field": "user_rating", "value": 5}}"#)
        .await;
    assert!(matches!(reply, AgentReply::Tool { .. }), "got {reply:?}");
    assert_eq!(store.get_recipe("stew").unwrap().unwrap().user_rating, Some(5.0));

    let mirrored = JsonMirror::new(dir.path().join("json")).read("stew").unwrap();
    assert_eq!(mirrored.user_rating, Some(5.0));
}

#[tokio::test]
async fn test_edit_missing_field_is_reported() {
    let (agent, _store, _dir) = setup().await;
    let reply = agent
        .respond(r#"{"function_name": "edit_recipe", "arguments": {"recipe_id": "42"}}"#)
        .await;
    let AgentReply::Failure(report) = reply else {
        panic!("expected a failure");
    };
    assert_eq!(report.kind, "missing_argument");
    assert_eq!(report.message, "To run edit_recipe I still need 'field'.");
}

#[tokio::test]
async fn test_add_recipe_then_find_it() {
    let (agent, store, _dir) = setup().await;
    let reply = agent
        .respond(r#"{"function_name": "run_processing_pipeline", "arguments": {"source_type": "file", "url": "miso.html"}}"#)
        .await;
    assert_eq!(reply.text(), "Added Miso Soup to your recipes.");
    assert_eq!(store.get_stats().unwrap().recipe_count, 5);

    let reply = agent
        .respond(r#"{"function_name": "find_single_recipe", "arguments": {"user_desire": "japanese miso soup"}}"#)
        .await;
    assert!(reply.text().contains("Miso Soup"), "got {}", reply.text());
}

#[tokio::test]
async fn test_add_refuses_files_outside_imports() {
    let (agent, store, _dir) = setup().await;
    let reply = agent
        .respond(r#"{"function_name": "run_processing_pipeline", "arguments": {"source_type": "file", "url": "../recipes.sqlite"}}"#)
        .await;
    match reply {
        AgentReply::Failure(report) => assert_eq!(report.kind, "invalid_argument"),
        other => panic!("unexpected reply: {other:?}"),
    }
    assert_eq!(store.get_stats().unwrap().recipe_count, 4);
}

#[tokio::test]
async fn test_chat_without_call() {
    let (agent, _store, _dir) = setup().await;
    let reply = agent.chat("thanks!").await.unwrap();
    assert_eq!(reply.text(), "Happy cooking!");
}
