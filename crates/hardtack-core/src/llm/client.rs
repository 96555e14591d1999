//! HTTP client for external LLM services (vLLM, OpenAI, etc.)

use super::cache::EmbeddingCache;
use crate::config::LLMServiceConfig;
use crate::error::{HardtackError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{atomic::AtomicU64, Arc};
use std::time::{Duration, Instant};

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(&self, messages: Vec<ChatMessage>, temperature: f32)
        -> Result<String>;

    /// Generate embeddings for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn embedding_dimensions(&self) -> usize;

    /// Get chat model name
    fn model_name(&self) -> &str;

    /// Get embedding model name
    fn embedding_model(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// vLLM/OpenAI-compatible client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    embedding_dimensions: usize,
    cache: Arc<EmbeddingCache>,
    metrics: Arc<APIMetrics>,
}

impl VLLMClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(HardtackError::Http)?;

        let embedding_dimensions = config.embedding_dimensions.unwrap_or(1536);

        Ok(Self {
            http_client,
            config,
            embedding_dimensions,
            cache: Arc::new(EmbeddingCache::default()),
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        use std::sync::atomic::Ordering;

        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        let hits = self.metrics.cache_hits.load(Ordering::Relaxed);
        let misses = self.metrics.cache_misses.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if hits + misses > 0 {
                hits as f64 / (hits + misses) as f64 * 100.0
            } else {
                0.0
            },
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn record_error(&self) {
        self.metrics
            .total_errors
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn record_latency(&self, start: Instant) {
        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, std::sync::atomic::Ordering::Relaxed);
    }

    /// POST a JSON body and decode the JSON reply
    ///
    /// Every failure (transport, HTTP status, body) is counted and mapped
    /// through `into_error`.
    async fn post_json<B, R>(
        &self,
        url: &str,
        body: &B,
        into_error: fn(String) -> HardtackError,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut req = self.http_client.post(url).json(body);
        if let Some(ref api_key) = self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                self.record_error();
                return Err(into_error(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.record_error();
            let body = response.text().await.unwrap_or_default();
            return Err(into_error(format!("HTTP {} from {}: {}", status, url, body)));
        }

        response.json::<R>().await.map_err(|e| {
            self.record_error();
            into_error(e.to_string())
        })
    }
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String> {
        use std::sync::atomic::Ordering;

        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature,
            max_tokens: 1024,
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let chat_response: ChatResponse = self.post_json(&url, &request, HardtackError::Llm).await?;

        let Some(choice) = chat_response.choices.into_iter().next() else {
            self.record_error();
            return Err(HardtackError::Llm("No choices in chat completion".to_string()));
        };
        let content = choice.message.content;
        tracing::debug!("Chat completion from {}: {} chars", self.config.model, content.len());

        self.record_latency(start);
        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| HardtackError::EmbeddingUnavailable("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::sync::atomic::Ordering;

        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        // Check cache for each text
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            if let Some(cached) = self.cache.get(&self.config.embedding_model, text) {
                results.push(Some(cached));
                self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
            results.push(None);
            uncached_texts.push(text.clone());
            uncached_indices.push(i);
        }

        if uncached_texts.is_empty() {
            tracing::debug!("All {} embeddings from cache", texts.len());
            return Ok(results.into_iter().flatten().collect());
        }

        tracing::debug!(
            "Embedding batch: {} cached, {} to fetch",
            texts.len() - uncached_texts.len(),
            uncached_texts.len()
        );

        #[derive(Serialize)]
        struct EmbedRequest {
            model: String,
            input: Vec<String>,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        let request = EmbedRequest {
            model: self.config.embedding_model.clone(),
            input: uncached_texts.clone(),
        };

        let url = format!("{}/v1/embeddings", self.config.embeddings_url());
        let embed_response: EmbedResponse = self
            .post_json(&url, &request, HardtackError::EmbeddingUnavailable)
            .await?;

        if embed_response.data.len() != uncached_texts.len() {
            self.record_error();
            return Err(HardtackError::EmbeddingUnavailable(format!(
                "Expected {} embeddings, got {}",
                uncached_texts.len(),
                embed_response.data.len()
            )));
        }

        for ((text, slot), data) in uncached_texts
            .iter()
            .zip(uncached_indices)
            .zip(embed_response.data)
        {
            self.cache
                .insert(&self.config.embedding_model, text, data.embedding.clone());
            results[slot] = Some(data.embedding);
        }

        self.record_latency(start);
        Ok(results.into_iter().flatten().collect())
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }
}

/// Extract the outermost JSON object from an LLM reply
///
/// Handles markdown code fences and chatter around the object.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}
