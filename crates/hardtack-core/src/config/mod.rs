//! Configuration management

use crate::error::{HardtackError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Retrieval defaults and bounds
    #[serde(default)]
    pub search: SearchConfig,

    /// Secondary-signal weights used by the ranker
    #[serde(default)]
    pub ranking: RankingWeights,

    /// Backoff policy for the recommendation engine
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Local storage locations
    #[serde(default)]
    pub storage: StorageConfig,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the LLM service for chat/completions
    pub url: String,

    /// Model name for chat completions (tool calling, recipe extraction)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("HARDTACK_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("HARDTACK_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("HARDTACK_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("HARDTACK_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("HARDTACK_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("HARDTACK_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "text-embedding-3-small".to_string())
}

fn default_timeout() -> u64 {
    60
}

/// Retrieval bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result count used when the caller does not ask for one
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Upper bound on any requested result count
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Number of ranked results cited in a recommendation summary
    #[serde(default = "default_summary_k")]
    pub summary_k: usize,

    /// Let the chat model plan field queries and rating filters
    #[serde(default = "default_plan_with_llm")]
    pub plan_with_llm: bool,
}

fn default_top_k() -> usize {
    5
}

fn default_max_top_k() -> usize {
    50
}

fn default_summary_k() -> usize {
    3
}

fn default_plan_with_llm() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            summary_k: default_summary_k(),
            plan_with_llm: default_plan_with_llm(),
        }
    }
}

/// Weights of the ranker's secondary signals
///
/// `final_score = raw_score + min(match_bonus * matches, max_match_bonus)
///  + recency_weight * recency - duplicate_penalty * is_duplicate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    /// Bonus per matched preference
    pub match_bonus: f64,
    /// Cap on the total preference bonus
    pub max_match_bonus: f64,
    /// Weight of the recency signal (0..=1 before weighting)
    pub recency_weight: f64,
    /// Age in days at which the recency signal reaches zero
    pub recency_window_days: f64,
    /// Penalty applied to near-duplicates of a better candidate
    pub duplicate_penalty: f64,
    /// Tag Jaccard similarity at which two recipes count as near-duplicates
    pub duplicate_tag_overlap: f64,
}

impl RankingWeights {
    /// Rank by raw similarity only
    pub fn none() -> Self {
        Self {
            match_bonus: 0.0,
            max_match_bonus: 0.0,
            recency_weight: 0.0,
            recency_window_days: 365.0,
            duplicate_penalty: 0.0,
            duplicate_tag_overlap: 1.0,
        }
    }
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            match_bonus: 0.05,
            max_match_bonus: 0.15,
            recency_weight: 0.02,
            recency_window_days: 365.0,
            duplicate_penalty: 0.10,
            duplicate_tag_overlap: 0.8,
        }
    }
}

/// Exponential backoff for transient retrieval failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled for each later one
    pub base_delay_ms: u64,
    /// Upper bound on a single delay
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Local storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `<id>.json` file per recipe
    #[serde(default = "default_mirror_dir")]
    pub mirror_dir: PathBuf,

    /// Saved HTML pages the assistant may import from
    #[serde(default = "default_import_dir")]
    pub import_dir: PathBuf,
}

fn default_mirror_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::DATA_DIR_NAME)
        .join("json")
}

fn default_import_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::DATA_DIR_NAME)
        .join("imports")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mirror_dir: default_mirror_dir(),
            import_dir: default_import_dir(),
        }
    }
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a path, falling back to defaults when it does not exist
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.search.default_top_k == 0 || self.search.max_top_k == 0 {
            return Err(HardtackError::Config(
                "search.default_top_k and search.max_top_k must be positive".to_string(),
            ));
        }
        if self.search.default_top_k > self.search.max_top_k {
            return Err(HardtackError::Config(format!(
                "search.default_top_k ({}) exceeds search.max_top_k ({})",
                self.search.default_top_k, self.search.max_top_k
            )));
        }
        if self.search.summary_k == 0 {
            return Err(HardtackError::Config(
                "search.summary_k must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(HardtackError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        let r = &self.ranking;
        let weights = [
            r.match_bonus,
            r.max_match_bonus,
            r.recency_weight,
            r.duplicate_penalty,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(HardtackError::Config(
                "ranking weights must be finite and non-negative".to_string(),
            ));
        }
        if !(r.recency_window_days.is_finite() && r.recency_window_days > 0.0) {
            return Err(HardtackError::Config(
                "ranking.recency_window_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
