//! Test doubles shared by unit tests

use crate::error::{HardtackError, Result};
use crate::llm::{ChatMessage, Embedder, LLMClient};
use crate::search::{FieldFilter, IndexHit, VectorIndex};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Embedder whose service is always down
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(HardtackError::EmbeddingUnavailable(
            "connection refused".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(HardtackError::EmbeddingUnavailable(
            "connection refused".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Index returning the same hits for every query, ignoring `top_k`
pub struct FixedIndex {
    hits: Vec<IndexHit>,
    pub calls: Arc<AtomicUsize>,
}

impl FixedIndex {
    pub fn new(hits: Vec<IndexHit>) -> Self {
        Self {
            hits,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl VectorIndex for FixedIndex {
    async fn search(
        &self,
        _embedding: &[f32],
        _filters: &BTreeMap<String, FieldFilter>,
        _top_k: usize,
    ) -> Result<Vec<IndexHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.clone())
    }

    async fn vector_for(&self, _recipe_id: &str) -> Result<Option<Vec<f32>>> {
        Ok(None)
    }
}

/// Index that fails the first `failures` searches, then returns `hits`
#[derive(Default)]
pub struct FailingIndex {
    /// `None` fails forever
    pub failures: Option<usize>,
    pub hits: Vec<IndexHit>,
    pub calls: Arc<AtomicUsize>,
}

impl FailingIndex {
    pub fn recovering_after(failures: usize, hits: Vec<IndexHit>) -> Self {
        Self {
            failures: Some(failures),
            hits,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn search(
        &self,
        _embedding: &[f32],
        _filters: &BTreeMap<String, FieldFilter>,
        _top_k: usize,
    ) -> Result<Vec<IndexHit>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures {
            Some(n) if call >= n => Ok(self.hits.clone()),
            _ => Err(HardtackError::RetrievalUnavailable(
                "index timed out".to_string(),
            )),
        }
    }

    async fn vector_for(&self, _recipe_id: &str) -> Result<Option<Vec<f32>>> {
        Ok(None)
    }
}

/// Chat client giving one canned answer, or failing when it has none
pub struct CannedChat {
    answer: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl CannedChat {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            answer: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// User messages received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for CannedChat {
    async fn chat_completion(&self, messages: Vec<ChatMessage>, _temperature: f32) -> Result<String> {
        if let Some(user) = messages.iter().rev().find(|m| m.role == "user") {
            self.requests.lock().unwrap().push(user.content.clone());
        }
        self.answer
            .clone()
            .ok_or_else(|| HardtackError::Llm("connection refused".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(HardtackError::EmbeddingUnavailable("chat only".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(HardtackError::EmbeddingUnavailable("chat only".to_string()))
    }

    fn embedding_dimensions(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "canned"
    }

    fn embedding_model(&self) -> &str {
        "none"
    }
}
