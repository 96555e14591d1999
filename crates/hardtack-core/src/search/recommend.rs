//! Recommendation engine: plan -> query -> retrieve -> rank -> summarize

use super::{
    summarize, summarize_one, Candidate, InlinePlanner, QueryBuilder, QueryContext, QueryParams,
    QueryPlan, QueryPlanner, RankedResult, Ranker, Retriever, Summary, VectorIndex,
};
use crate::config::{Config, RetryPolicy, SearchConfig};
use crate::error::{HardtackError, Result};
use crate::llm::Embedder;
use std::sync::Arc;

/// Composes the retrieval stages for one request
pub struct RecommendationEngine {
    planner: Arc<dyn QueryPlanner>,
    builder: QueryBuilder,
    retriever: Retriever,
    ranker: Ranker,
    summary_k: usize,
    retry: RetryPolicy,
}

impl RecommendationEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        search: SearchConfig,
    ) -> Self {
        let summary_k = search.summary_k;
        Self {
            planner: Arc::new(InlinePlanner),
            builder: QueryBuilder::new(embedder, index.clone(), search),
            retriever: Retriever::new(index),
            ranker: Ranker::default(),
            summary_k,
            retry: RetryPolicy::default(),
        }
    }

    /// Build an engine using the search, ranking and retry sections of `config`
    pub fn from_config(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: &Config,
    ) -> Self {
        Self::new(embedder, index, config.search.clone())
            .with_ranker(Ranker::new(config.ranking))
            .with_retry(config.retry)
    }

    pub fn with_planner(mut self, planner: Arc<dyn QueryPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_ranker(mut self, ranker: Ranker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Ranked results for a request
    ///
    /// Planned filters apply unless `context` sets the same field; planned
    /// preferences add to the context's.
    pub async fn search(&self, text: &str, context: &QueryContext) -> Result<Vec<RankedResult>> {
        let plan = self.plan(text).await;
        let mut context = context.clone();
        for (field, filter) in plan.filters {
            context.filters.entry(field).or_insert(filter);
        }
        let candidates = self.retrieve_with_retry(&plan.text, &context).await?;

        let mut preferences = context.preferences;
        preferences.extend(plan.preferences);
        if preferences.is_empty() {
            return Ok(self.ranker.rank(&candidates));
        }
        let ranker = self.ranker.clone().with_preferences(preferences);
        Ok(ranker.rank(&candidates))
    }

    async fn plan(&self, text: &str) -> QueryPlan {
        match self.planner.plan(text).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Query planning failed, using inline filters: {}", e);
                QueryPlan::inline(text)
            }
        }
    }

    /// Summary of the best few matches
    pub async fn recommend(&self, text: &str, context: &QueryContext) -> Result<Summary> {
        let ranked = self.search(text, context).await?;
        if ranked.is_empty() {
            tracing::debug!("No candidates for '{}'", text);
        }
        self.summarize_ranked(&ranked)
    }

    /// Summary of already ranked results, citing at most `summary_k` of them
    pub fn summarize_ranked(&self, ranked: &[RankedResult]) -> Result<Summary> {
        let k = self.summary_k.min(ranked.len());
        match summarize(ranked, k) {
            Err(HardtackError::EmptyResult) => Ok(Summary::no_matches()),
            other => other,
        }
    }

    /// Summary of the single best match
    pub async fn find_one(&self, text: &str, context: &QueryContext) -> Result<Summary> {
        let ranked = self.search(text, context).await?;
        Ok(ranked.first().map(summarize_one).unwrap_or_else(Summary::no_matches))
    }

    async fn retrieve_with_retry(
        &self,
        text: &str,
        context: &QueryContext,
    ) -> Result<Vec<Candidate>> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.build_and_retrieve(text, context).await {
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed: {} (retrying in {:?})",
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn build_and_retrieve(
        &self,
        text: &str,
        context: &QueryContext,
    ) -> Result<Vec<Candidate>> {
        let params: QueryParams = self.builder.build(text, context).await?;
        self.retriever.retrieve(&params).await
    }
}
