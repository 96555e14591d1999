//! The recipe tools exposed to the model

use super::registry::{
    ArgumentSchema, ArgumentSpec, ToolHandler, ToolOutput, ToolRegistry, ValueKind,
};
use crate::error::{HardtackError, Result};
use crate::llm::Embedder;
use crate::pipeline::{ImportDir, ProcessingPipeline, Source};
use crate::search::{QueryContext, RecommendationEngine};
use crate::store::{RecipeMirror, RecipeRepository};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const FIND_SINGLE_RECIPE: &str = "find_single_recipe";
pub const SHOW_RECIPE: &str = "show_recipe";
pub const EDIT_RECIPE: &str = "edit_recipe";
pub const RUN_RECOMMENDATION_ENGINE: &str = "run_recommendation_engine";
pub const RUN_PROCESSING_PIPELINE: &str = "run_processing_pipeline";

/// Reply that accompanies a displayed recipe
pub const SHOW_RECIPE_MESSAGE: &str = "Sure! Take a look at this.";

/// Collaborators shared by the default tools
#[derive(Clone)]
pub struct ToolServices {
    pub engine: Arc<RecommendationEngine>,
    pub repository: Arc<dyn RecipeRepository>,
    pub mirror: Arc<dyn RecipeMirror>,
    pub embedder: Arc<dyn Embedder>,
    pub pipeline: Arc<ProcessingPipeline>,
    /// Where `file` sources may be read from; `None` allows URLs only
    pub imports: Option<ImportDir>,
}

/// Registry holding exactly the five recipe tools
pub fn default_registry(services: ToolServices) -> Result<ToolRegistry> {
    let desire_schema = || {
        ArgumentSchema::new(vec![
            ArgumentSpec::required(
                "user_desire",
                ValueKind::String,
                "What the user is in the mood for, in their own words",
            ),
            ArgumentSpec::optional("top_k", ValueKind::Integer, "How many recipes to consider"),
            ArgumentSpec::optional(
                "min_score",
                ValueKind::Number,
                "Minimum similarity between 0 and 1",
            ),
        ])
    };

    ToolRegistry::builder()
        .register(
            FIND_SINGLE_RECIPE,
            "Find the one saved recipe that best matches a description",
            desire_schema(),
            Arc::new(FindSingleRecipe {
                engine: services.engine.clone(),
            }),
        )
        .register(
            SHOW_RECIPE,
            "Show the full text of a saved recipe",
            ArgumentSchema::new(vec![ArgumentSpec::required(
                "recipe_id",
                ValueKind::String,
                "Id of the recipe",
            )]),
            Arc::new(ShowRecipe {
                repository: services.repository.clone(),
            }),
        )
        .register(
            EDIT_RECIPE,
            "Change one field of a saved recipe, such as user_notes, user_rating or cooked_already",
            ArgumentSchema::new(vec![
                ArgumentSpec::required("recipe_id", ValueKind::String, "Id of the recipe"),
                ArgumentSpec::required("field", ValueKind::String, "Name of an existing field"),
                ArgumentSpec::required("value", ValueKind::Any, "New value for the field"),
            ]),
            Arc::new(EditRecipe {
                repository: services.repository.clone(),
                mirror: services.mirror.clone(),
                embedder: services.embedder.clone(),
            }),
        )
        .register(
            RUN_RECOMMENDATION_ENGINE,
            "Suggest a few saved recipes for a craving, occasion or ingredient",
            desire_schema(),
            Arc::new(Recommend {
                engine: services.engine,
            }),
        )
        .register(
            RUN_PROCESSING_PIPELINE,
            "Add a new recipe from a web page or a saved HTML file in the import folder",
            ArgumentSchema::new(vec![
                ArgumentSpec::required(
                    "source_type",
                    ValueKind::String,
                    "Either 'url' or 'file'",
                ),
                ArgumentSpec::required(
                    "url",
                    ValueKind::String,
                    "Web address, or name of the HTML file in the import folder",
                ),
            ]),
            Arc::new(ProcessSource {
                pipeline: services.pipeline,
                imports: services.imports,
            }),
        )
        .build()
}

/// Recoverable errors pass through; anything else is reported as a tool failure
fn tool_failed(name: &str, error: HardtackError) -> HardtackError {
    if error.is_recoverable() {
        return error;
    }
    tracing::warn!("{} failed: {}", name, error);
    HardtackError::ToolFailed {
        name: name.to_string(),
        message: error.user_message(),
    }
}

fn string_arg<'a>(arguments: &'a Map<String, Value>, function: &str, key: &str) -> Result<&'a str> {
    match arguments.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(Value::Null) | None => Err(HardtackError::missing_argument(function, key)),
        Some(_) => Err(HardtackError::invalid_argument(function, key, "a string")),
    }
}

fn query_context(arguments: &Map<String, Value>, function: &str) -> Result<QueryContext> {
    let mut context = QueryContext::default();
    match arguments.get("top_k") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let top_k = value
                .as_u64()
                .ok_or_else(|| HardtackError::invalid_argument(function, "top_k", "a positive integer"))?;
            context = context.with_top_k(top_k as usize);
        }
    }
    match arguments.get("min_score") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let min_score = value
                .as_f64()
                .ok_or_else(|| HardtackError::invalid_argument(function, "min_score", "a number"))?;
            context = context.with_min_score(min_score);
        }
    }
    Ok(context)
}

struct FindSingleRecipe {
    engine: Arc<RecommendationEngine>,
}

#[async_trait]
impl ToolHandler for FindSingleRecipe {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<ToolOutput> {
        let desire = string_arg(arguments, FIND_SINGLE_RECIPE, "user_desire")?;
        let context = query_context(arguments, FIND_SINGLE_RECIPE)?;
        let summary = self
            .engine
            .find_one(desire, &context)
            .await
            .map_err(|e| tool_failed(FIND_SINGLE_RECIPE, e))?;
        Ok(ToolOutput::summary(summary))
    }
}

struct Recommend {
    engine: Arc<RecommendationEngine>,
}

#[async_trait]
impl ToolHandler for Recommend {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<ToolOutput> {
        let desire = string_arg(arguments, RUN_RECOMMENDATION_ENGINE, "user_desire")?;
        let context = query_context(arguments, RUN_RECOMMENDATION_ENGINE)?;
        let summary = self
            .engine
            .recommend(desire, &context)
            .await
            .map_err(|e| tool_failed(RUN_RECOMMENDATION_ENGINE, e))?;
        Ok(ToolOutput::summary(summary))
    }
}

struct ShowRecipe {
    repository: Arc<dyn RecipeRepository>,
}

#[async_trait]
impl ToolHandler for ShowRecipe {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<ToolOutput> {
        let id = string_arg(arguments, SHOW_RECIPE, "recipe_id")?;
        let recipe = self
            .repository
            .get(id)
            .await
            .map_err(|e| tool_failed(SHOW_RECIPE, e))?
            .ok_or_else(|| HardtackError::RecipeNotFound(id.to_string()))?;
        Ok(ToolOutput::recipe(SHOW_RECIPE_MESSAGE, recipe))
    }
}

struct EditRecipe {
    repository: Arc<dyn RecipeRepository>,
    mirror: Arc<dyn RecipeMirror>,
    embedder: Arc<dyn Embedder>,
}

impl EditRecipe {
    async fn edit(&self, id: &str, field: &str, value: &Value) -> Result<ToolOutput> {
        let mut preview = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| HardtackError::RecipeNotFound(id.to_string()))?;
        preview.apply_update(field, value)?;

        // Embed before writing so a failed embedding leaves the record untouched
        let embedding = self.embedder.embed(&preview.embedding_text()).await?;
        if embedding.is_empty() {
            return Err(HardtackError::EmbeddingUnavailable(
                "embedder returned an empty vector".to_string(),
            ));
        }

        let updated = self
            .repository
            .update(id, field, value, self.embedder.model_name(), &embedding)
            .await?;
        if let Err(e) = self.mirror.write(&updated).await {
            tracing::warn!("Failed to update mirror for {}: {}", id, e);
        }

        tracing::info!("Updated {} of recipe {}", field, id);
        Ok(ToolOutput::recipe(
            format!("Updated {} for {}.", field, updated.dish_name),
            updated,
        ))
    }
}

#[async_trait]
impl ToolHandler for EditRecipe {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<ToolOutput> {
        let id = string_arg(arguments, EDIT_RECIPE, "recipe_id")?;
        let field = string_arg(arguments, EDIT_RECIPE, "field")?;
        let value = arguments
            .get("value")
            .ok_or_else(|| HardtackError::missing_argument(EDIT_RECIPE, "value"))?;
        self.edit(id, field, value)
            .await
            .map_err(|e| tool_failed(EDIT_RECIPE, e))
    }
}

struct ProcessSource {
    pipeline: Arc<ProcessingPipeline>,
    imports: Option<ImportDir>,
}

#[async_trait]
impl ToolHandler for ProcessSource {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<ToolOutput> {
        let source_type = string_arg(arguments, RUN_PROCESSING_PIPELINE, "source_type")?;
        let location = string_arg(arguments, RUN_PROCESSING_PIPELINE, "url")?;
        let source = Source::from_parts(source_type, location, self.imports.as_ref())?;
        let recipe = self
            .pipeline
            .run(&source)
            .await
            .map_err(|e| tool_failed(RUN_PROCESSING_PIPELINE, e))?;
        Ok(ToolOutput::recipe(
            format!("Added {} to your recipes.", recipe.dish_name),
            recipe,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Dispatcher, ToolCall};
    use crate::config::{RetryPolicy, SearchConfig};
    use crate::llm::HashingEmbedder;
    use crate::pipeline::{ContentFetcher, HttpFetcher, RecipeExtractor};
    use crate::recipe::tests::sample_recipe;
    use crate::recipe::Recipe;
    use crate::store::{JsonMirror, RecipeStore};
    use crate::testing::{FailingEmbedder, FailingIndex};
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct PageFetcher;

    #[async_trait]
    impl ContentFetcher for PageFetcher {
        async fn fetch(&self, _source: &Source) -> Result<String> {
            Ok("<h1>Shakshuka</h1><p>Eggs in tomato sauce.</p>".to_string())
        }
    }

    struct NamedExtractor;

    #[async_trait]
    impl RecipeExtractor for NamedExtractor {
        async fn extract(&self, _text: &str) -> Result<Recipe> {
            Ok(Recipe {
                dish_name: "Shakshuka".into(),
                tags: vec!["breakfast".into(), "vegetarian".into()],
                ..Default::default()
            })
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<RecipeStore>,
        mirror: Arc<JsonMirror>,
        dispatcher: Dispatcher,
    }

    async fn fixture_with(embedder: Arc<dyn Embedder>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RecipeStore::open_in_memory().unwrap());
        let mirror = Arc::new(JsonMirror::new(dir.path()));
        let seed = HashingEmbedder::default();
        for (id, dish, tags) in [
            ("r1", "Vegan Chocolate Cake", &["dessert", "vegan"][..]),
            ("r2", "Lemon Tart", &["dessert", "citrus"][..]),
            ("r3", "Beef Stew", &["dinner", "winter"][..]),
        ] {
            let recipe = sample_recipe(id, dish, tags);
            let embedding = seed.embed(&recipe.embedding_text()).await.unwrap();
            store.insert_recipe(&recipe, "feature-hashing", &embedding).unwrap();
            mirror.write(&recipe).await.unwrap();
        }

        let engine = Arc::new(
            RecommendationEngine::new(embedder.clone(), store.clone(), SearchConfig::default())
                .with_retry(RetryPolicy::none()),
        );
        let pipeline = Arc::new(ProcessingPipeline::new(
            Arc::new(PageFetcher),
            Arc::new(NamedExtractor),
            embedder.clone(),
            store.clone(),
            mirror.clone(),
        ));
        let registry = default_registry(ToolServices {
            engine,
            repository: store.clone(),
            mirror: mirror.clone(),
            embedder,
            pipeline,
            imports: None,
        })
        .unwrap();

        Fixture {
            _dir: dir,
            store,
            mirror,
            dispatcher: Dispatcher::new(Arc::new(registry)),
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(HashingEmbedder::default())).await
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        match arguments {
            Value::Object(map) => ToolCall::new(name, map),
            _ => panic!("arguments must be an object"),
        }
    }

    #[tokio::test]
    async fn test_default_registry_names() {
        let f = fixture().await;
        assert_eq!(
            f.dispatcher.registry().names(),
            vec![
                FIND_SINGLE_RECIPE,
                SHOW_RECIPE,
                EDIT_RECIPE,
                RUN_RECOMMENDATION_ENGINE,
                RUN_PROCESSING_PIPELINE
            ]
        );
    }

    #[tokio::test]
    async fn test_show_recipe() {
        let f = fixture().await;
        let out = f
            .dispatcher
            .dispatch(&call(SHOW_RECIPE, json!({"recipe_id": "r2"})))
            .await
            .unwrap();
        assert_eq!(out.message, SHOW_RECIPE_MESSAGE);
        assert_eq!(out.recipe.unwrap().dish_name, "Lemon Tart");

        let err = f
            .dispatcher
            .dispatch(&call(SHOW_RECIPE, json!({"recipe_id": "missing"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "recipe_not_found");
    }

    #[tokio::test]
    async fn test_recommend_cites_stored_recipes() {
        let f = fixture().await;
        let out = f
            .dispatcher
            .dispatch(&call(
                RUN_RECOMMENDATION_ENGINE,
                json!({"user_desire": "vegan chocolate dessert", "top_k": 2}),
            ))
            .await
            .unwrap();
        let summary = out.summary.unwrap();
        assert!(!summary.cited_recipe_ids.is_empty());
        assert!(summary.cited_recipe_ids.len() <= 2);
        assert_eq!(summary.cited_recipe_ids[0], "r1");
        assert_eq!(out.message, summary.text);
    }

    #[tokio::test]
    async fn test_find_single_recipe() {
        let f = fixture().await;
        let out = f
            .dispatcher
            .dispatch(&call(FIND_SINGLE_RECIPE, json!({"user_desire": "lemon tart"})))
            .await
            .unwrap();
        assert_eq!(out.summary.unwrap().cited_recipe_ids, vec!["r2".to_string()]);
    }

    #[tokio::test]
    async fn test_search_failure_becomes_tool_failed() {
        let f = fixture_with(Arc::new(FailingEmbedder)).await;
        let err = f
            .dispatcher
            .dispatch(&call(RUN_RECOMMENDATION_ENGINE, json!({"user_desire": "soup"})))
            .await
            .unwrap_err();
        match err {
            HardtackError::ToolFailed { name, message } => {
                assert_eq!(name, RUN_RECOMMENDATION_ENGINE);
                assert!(message.contains("unavailable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retrieval_outage_becomes_tool_failed() {
        let engine = RecommendationEngine::new(
            Arc::new(HashingEmbedder::default()),
            Arc::new(FailingIndex::default()),
            SearchConfig::default(),
        )
        .with_retry(RetryPolicy::none());
        let handler = Recommend {
            engine: Arc::new(engine),
        };
        let args = match json!({"user_desire": "soup"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let err = handler.call(&args).await.unwrap_err();
        assert_eq!(err.kind(), "tool_failed");
    }

    #[tokio::test]
    async fn test_edit_recipe_updates_store_vector_and_mirror() {
        let f = fixture().await;
        let before = f.store.get_embedding("r3").unwrap().unwrap();
        let out = f
            .dispatcher
            .dispatch(&call(
                EDIT_RECIPE,
                json!({"recipe_id": "r3", "field": "tags", "value": ["dinner", "slow cooker"]}),
            ))
            .await
            .unwrap();
        assert_eq!(out.message, "Updated tags for Beef Stew.");

        let stored = f.store.get_recipe("r3").unwrap().unwrap();
        assert_eq!(stored.tags, vec!["dinner", "slow cooker"]);
        assert_ne!(f.store.get_embedding("r3").unwrap().unwrap(), before);
        assert_eq!(f.mirror.read("r3").unwrap().tags, stored.tags);
    }

    #[tokio::test]
    async fn test_edit_recipe_rejects_new_keys_and_bad_values() {
        let f = fixture().await;
        let err = f
            .dispatcher
            .dispatch(&call(
                EDIT_RECIPE,
                json!({"recipe_id": "r1", "field": "spice_level", "value": "hot"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");

        let err = f
            .dispatcher
            .dispatch(&call(
                EDIT_RECIPE,
                json!({"recipe_id": "r1", "field": "user_rating", "value": 7}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert_eq!(f.store.get_recipe("r1").unwrap().unwrap().user_rating, None);

        let err = f
            .dispatcher
            .dispatch(&call(
                EDIT_RECIPE,
                json!({"recipe_id": "nope", "field": "user_notes", "value": "good"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "recipe_not_found");
    }

    #[tokio::test]
    async fn test_edit_recreates_missing_mirror_copy() {
        let f = fixture().await;
        std::fs::remove_file(f.mirror.path_for("r2")).unwrap();
        f.dispatcher
            .dispatch(&call(
                EDIT_RECIPE,
                json!({"recipe_id": "r2", "field": "cooked_already", "value": true}),
            ))
            .await
            .unwrap();
        let stored = f.store.get_recipe("r2").unwrap().unwrap();
        assert!(stored.cooked_already);
        assert_eq!(f.mirror.read("r2").unwrap(), stored);
    }

    /// Store whose atomic update always fails, as if the vector write broke
    struct BrokenUpdates(Arc<RecipeStore>);

    #[async_trait]
    impl RecipeRepository for BrokenUpdates {
        async fn get(&self, id: &str) -> Result<Option<Recipe>> {
            self.0.get_recipe(id)
        }

        async fn insert(&self, recipe: &Recipe, model: &str, embedding: &[f32]) -> Result<()> {
            self.0.insert_recipe(recipe, model, embedding)
        }

        async fn update(
            &self,
            _id: &str,
            _field: &str,
            _value: &Value,
            _model: &str,
            _embedding: &[f32],
        ) -> Result<Recipe> {
            Err(HardtackError::Database(rusqlite::Error::InvalidQuery))
        }
    }

    #[tokio::test]
    async fn test_failed_edit_changes_nothing() {
        let f = fixture().await;
        let before = f.store.get_embedding("r1").unwrap();
        let handler = EditRecipe {
            repository: Arc::new(BrokenUpdates(f.store.clone())),
            mirror: f.mirror.clone(),
            embedder: Arc::new(HashingEmbedder::default()),
        };
        let args = match json!({"recipe_id": "r1", "field": "dish_name", "value": "Lamb Tagine"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let err = handler.call(&args).await.unwrap_err();
        assert_eq!(err.kind(), "tool_failed");
        assert_eq!(
            f.store.get_recipe("r1").unwrap().unwrap().dish_name,
            "Vegan Chocolate Cake"
        );
        assert_eq!(f.store.get_embedding("r1").unwrap(), before);
        assert_eq!(f.mirror.read("r1").unwrap().dish_name, "Vegan Chocolate Cake");
    }

    #[tokio::test]
    async fn test_processing_pipeline_tool() {
        let f = fixture().await;
        let out = f
            .dispatcher
            .dispatch(&call(
                RUN_PROCESSING_PIPELINE,
                json!({"source_type": "url", "url": "https://example.com/shakshuka"}),
            ))
            .await
            .unwrap();
        assert_eq!(out.message, "Added Shakshuka to your recipes.");
        let recipe = out.recipe.unwrap();
        assert!(f.store.get_recipe(&recipe.id).unwrap().is_some());

        let err = f
            .dispatcher
            .dispatch(&call(
                RUN_PROCESSING_PIPELINE,
                json!({"source_type": "ftp", "url": "ftp://example.com/x"}),
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HardtackError::InvalidArgument { ref key, .. } if key == "source_type"
        ));
    }

    #[tokio::test]
    async fn test_negative_top_k_is_invalid() {
        let f = fixture().await;
        let err = f
            .dispatcher
            .dispatch(&call(
                RUN_RECOMMENDATION_ENGINE,
                json!({"user_desire": "soup", "top_k": -3}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    /// Extractor remembering every text it was handed
    #[derive(Default)]
    struct RecordingExtractor {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RecipeExtractor for RecordingExtractor {
        async fn extract(&self, text: &str) -> Result<Recipe> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(Recipe {
                dish_name: "Dal".into(),
                ..Default::default()
            })
        }
    }

    fn file_import_handler(
        dir: &TempDir,
        imports: Option<ImportDir>,
    ) -> (ProcessSource, Arc<RecordingExtractor>) {
        let extractor = Arc::new(RecordingExtractor::default());
        let pipeline = ProcessingPipeline::new(
            Arc::new(HttpFetcher::new()),
            extractor.clone(),
            Arc::new(HashingEmbedder::default()),
            Arc::new(RecipeStore::open_in_memory().unwrap()),
            Arc::new(JsonMirror::new(dir.path().join("json"))),
        );
        let handler = ProcessSource {
            pipeline: Arc::new(pipeline),
            imports,
        };
        (handler, extractor)
    }

    fn file_args(location: &str) -> Map<String, Value> {
        match json!({"source_type": "file", "url": location}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_file_import_confined_to_import_dir() {
        let dir = TempDir::new().unwrap();
        let imports = dir.path().join("imports");
        std::fs::create_dir_all(&imports).unwrap();
        std::fs::write(dir.path().join("private.html"), "<p>private</p>").unwrap();
        let (handler, extractor) = file_import_handler(&dir, Some(ImportDir::new(&imports)));

        for location in ["/etc/passwd", "../private.html", "imports/../../private.html"] {
            let err = handler.call(&file_args(location)).await.unwrap_err();
            assert!(
                matches!(err, HardtackError::InvalidArgument { ref key, .. } if key == "url"),
                "{location}: {err:?}"
            );
        }
        assert!(extractor.seen.lock().unwrap().is_empty());

        std::fs::write(imports.join("dal.html"), "<h1>Dal</h1><p>Simmer lentils.</p>").unwrap();
        let out = handler.call(&file_args("dal.html")).await.unwrap();
        assert_eq!(out.message, "Added Dal to your recipes.");
        assert_eq!(
            extractor.seen.lock().unwrap().as_slice(),
            ["Dal\nSimmer lentils.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_file_import_disabled_without_import_dir() {
        let dir = TempDir::new().unwrap();
        let (handler, extractor) = file_import_handler(&dir, None);
        let err = handler.call(&file_args("/etc/passwd")).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert!(extractor.seen.lock().unwrap().is_empty());
    }
}
