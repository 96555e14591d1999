//! Embedding cache for the HTTP client
//!
//! Queries repeat a lot in a chat session ("something vegan", then
//! "something vegan with rice"), so vectors are kept per model and text.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Vectors keyed by model + blake3 of the input text, with a TTL and a size bound
pub struct EmbeddingCache {
    entries: RwLock<HashMap<blake3::Hash, (Vec<f32>, Instant)>>,
    ttl: Duration,
    capacity: usize,
}

impl EmbeddingCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn key(model: &str, text: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(model.as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        hasher.finalize()
    }

    pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        let entries = self.entries.read().ok()?;
        let (vector, stored_at) = entries.get(&Self::key(model, text))?;
        (stored_at.elapsed() < self.ttl).then(|| vector.clone())
    }

    /// Store a vector, sweeping expired entries when the cache is full
    ///
    /// If the cache is still full after the sweep, the new vector is dropped.
    pub fn insert(&self, model: &str, text: &str, vector: Vec<f32>) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        if entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, (_, stored_at)| stored_at.elapsed() < ttl);
        }
        if entries.len() < self.capacity {
            entries.insert(Self::key(model, text), (vector, Instant::now()));
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600), 4096)
    }
}
