//! Wiring of configuration, storage, embedder and tools

use anyhow::Result;
use hardtack_core::agent::Dispatcher;
use hardtack_core::search::LlmQueryPlanner;
use hardtack_core::{
    default_registry, Agent, Config, Embedder, HashingEmbedder, HttpEmbedder, HttpFetcher,
    ImportDir, JsonMirror, LlmRecipeExtractor, ProcessingPipeline, RecipeStore,
    RecommendationEngine, ToolRegistry, ToolServices, VLLMClient,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command may need, opened once per invocation
pub struct Services {
    pub config: Config,
    pub db_path: PathBuf,
    pub store: Arc<RecipeStore>,
    pub mirror: Arc<JsonMirror>,
    pub imports: ImportDir,
    pub embedder: Arc<dyn Embedder>,
    pub client: Arc<VLLMClient>,
    pub engine: Arc<RecommendationEngine>,
}

impl Services {
    pub fn open() -> Result<Self> {
        let config = Config::load()?;

        // Use HARDTACK_DB / HARDTACK_MIRROR_DIR / HARDTACK_IMPORT_DIR if set, otherwise the defaults
        let db_path = RecipeStore::default_path();
        let store = Arc::new(RecipeStore::open(&db_path)?);
        let mirror_dir = std::env::var("HARDTACK_MIRROR_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config.storage.mirror_dir.clone());
        let mirror = Arc::new(JsonMirror::new(mirror_dir));
        let imports = ImportDir::new(
            std::env::var("HARDTACK_IMPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| config.storage.import_dir.clone()),
        );

        let client = Arc::new(VLLMClient::new(config.llm_service.clone())?);
        let embedder: Arc<dyn Embedder> = if config.llm_service.embedding_url.is_some() {
            Arc::new(HttpEmbedder::new(client.clone()))
        } else {
            tracing::debug!("No embedding service configured, using feature hashing");
            Arc::new(HashingEmbedder::default())
        };

        let mut engine =
            RecommendationEngine::from_config(embedder.clone(), store.clone(), &config);
        if config.search.plan_with_llm {
            engine = engine.with_planner(Arc::new(LlmQueryPlanner::new(client.clone())));
        }
        let engine = Arc::new(engine);

        Ok(Self {
            config,
            db_path,
            store,
            mirror,
            imports,
            embedder,
            client,
            engine,
        })
    }

    pub fn pipeline(&self) -> ProcessingPipeline {
        ProcessingPipeline::new(
            Arc::new(HttpFetcher::new()),
            Arc::new(LlmRecipeExtractor::new(self.client.clone())),
            self.embedder.clone(),
            self.store.clone(),
            self.mirror.clone(),
        )
    }

    /// Registry with the five recipe tools
    pub fn registry(&self) -> Result<ToolRegistry> {
        let registry = default_registry(ToolServices {
            engine: self.engine.clone(),
            repository: self.store.clone(),
            mirror: self.mirror.clone(),
            embedder: self.embedder.clone(),
            pipeline: Arc::new(self.pipeline()),
            imports: Some(self.imports.clone()),
        })?;
        Ok(registry)
    }

    pub fn dispatcher(&self) -> Result<Dispatcher> {
        Ok(Dispatcher::new(Arc::new(self.registry()?)))
    }

    pub fn agent(&self) -> Result<Agent> {
        Ok(Agent::new(self.client.clone(), self.dispatcher()?))
    }
}
