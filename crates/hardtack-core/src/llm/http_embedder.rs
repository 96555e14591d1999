//! Embedder backed by the HTTP LLM service

use super::{Embedder, LLMClient};
use crate::error::{HardtackError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Embeds through `LLMClient`, reporting every failure as `EmbeddingUnavailable`
///
/// The query builder retries on that kind only, so a refused connection and
/// a garbled reply are treated alike.
pub struct HttpEmbedder {
    client: Arc<dyn LLMClient>,
}

impl HttpEmbedder {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

fn unavailable(err: HardtackError) -> HardtackError {
    match err {
        HardtackError::EmbeddingUnavailable(_) => err,
        other => HardtackError::EmbeddingUnavailable(other.to_string()),
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await.map_err(unavailable)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts).await.map_err(unavailable)
    }

    fn dimensions(&self) -> usize {
        self.client.embedding_dimensions()
    }

    fn model_name(&self) -> &str {
        self.client.embedding_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    struct BrokenClient;

    #[async_trait]
    impl LLMClient for BrokenClient {
        async fn chat_completion(&self, _: Vec<ChatMessage>, _: f32) -> Result<String> {
            Err(HardtackError::Llm("down".into()))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(HardtackError::ExternalError("connection refused".into()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(HardtackError::EmbeddingUnavailable("HTTP 503".into()))
        }

        fn embedding_dimensions(&self) -> usize {
            16
        }

        fn model_name(&self) -> &str {
            "chat"
        }

        fn embedding_model(&self) -> &str {
            "embed-small"
        }
    }

    #[tokio::test]
    async fn test_failures_become_embedding_unavailable() {
        let embedder = HttpEmbedder::new(Arc::new(BrokenClient));

        let err = embedder.embed("soup").await.unwrap_err();
        assert!(matches!(err, HardtackError::EmbeddingUnavailable(ref m) if m.contains("connection refused")));
        assert!(err.is_transient());

        let err = embedder.embed_batch(&["soup".into()]).await.unwrap_err();
        assert!(matches!(err, HardtackError::EmbeddingUnavailable(ref m) if m == "HTTP 503"));
    }

    #[test]
    fn test_reports_client_model() {
        let embedder = HttpEmbedder::new(Arc::new(BrokenClient));
        assert_eq!(embedder.model_name(), "embed-small");
        assert_eq!(embedder.dimensions(), 16);
    }
}
