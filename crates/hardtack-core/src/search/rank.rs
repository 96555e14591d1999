//! Deterministic re-ranking of retrieval candidates

use super::{Candidate, RankedResult};
use crate::config::RankingWeights;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;

/// Re-scores candidates with secondary signals and orders them
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: RankingWeights,
    preferences: Vec<(String, Value)>,
}

impl Ranker {
    pub fn new(weights: RankingWeights) -> Self {
        Self {
            weights,
            preferences: Vec::new(),
        }
    }

    /// Add soft field/value preferences that earn a bonus when matched
    pub fn with_preferences(
        mut self,
        preferences: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        self.preferences.extend(preferences);
        self
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Rank candidates
    ///
    /// Output is sorted by `final_score` descending with ties broken by
    /// ascending `recipe_id`, and does not depend on input order.
    pub fn rank(&self, candidates: &[Candidate]) -> Vec<RankedResult> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut canonical: Vec<&Candidate> = candidates.iter().collect();
        canonical.sort_by(|a, b| {
            b.raw_score
                .total_cmp(&a.raw_score)
                .then_with(|| a.recipe_id.cmp(&b.recipe_id))
        });

        let dates: Vec<Option<NaiveDate>> = canonical.iter().map(|c| date_added(c)).collect();
        let newest = dates.iter().flatten().max().copied();

        let mut scored: Vec<(f64, &Candidate)> = Vec::with_capacity(canonical.len());
        for (i, candidate) in canonical.iter().enumerate() {
            let matches = self.matched_preferences(candidate) as f64;
            let bonus = (self.weights.match_bonus * matches).min(self.weights.max_match_bonus);
            let recency = match (dates[i], newest) {
                (Some(date), Some(newest)) => self.recency(date, newest),
                _ => 0.0,
            };
            let duplicate = canonical[..i]
                .iter()
                .any(|better| self.is_near_duplicate(candidate, better));

            let mut final_score = candidate.raw_score + bonus + self.weights.recency_weight * recency;
            if duplicate {
                final_score -= self.weights.duplicate_penalty;
            }
            scored.push((final_score, *candidate));
        }

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| a.recipe_id.cmp(&b.recipe_id))
        });

        let ranked: Vec<RankedResult> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (final_score, candidate))| RankedResult {
                candidate: candidate.clone(),
                final_score,
                rank: i + 1,
            })
            .collect();

        tracing::debug!("Ranked {} candidates", ranked.len());
        ranked
    }

    fn matched_preferences(&self, candidate: &Candidate) -> usize {
        self.preferences
            .iter()
            .filter(|(field, wanted)| {
                candidate
                    .metadata
                    .get(field)
                    .is_some_and(|value| value_matches(value, wanted))
            })
            .count()
    }

    fn recency(&self, date: NaiveDate, newest: NaiveDate) -> f64 {
        let age = (newest - date).num_days() as f64;
        (1.0 - age / self.weights.recency_window_days).clamp(0.0, 1.0)
    }

    fn is_near_duplicate(&self, candidate: &Candidate, better: &Candidate) -> bool {
        if let (Some(a), Some(b)) = (candidate.text("dish_name"), better.text("dish_name")) {
            let (a, b) = (normalize_name(a), normalize_name(b));
            if !a.is_empty() && a == b {
                return true;
            }
        }
        tag_overlap(candidate, better)
            .is_some_and(|overlap| overlap >= self.weights.duplicate_tag_overlap)
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(RankingWeights::default())
    }
}

fn value_matches(value: &Value, wanted: &Value) -> bool {
    match (value, wanted) {
        (Value::Array(items), _) => items.iter().any(|item| value_matches(item, wanted)),
        (Value::String(a), Value::String(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == wanted,
    }
}

fn date_added(candidate: &Candidate) -> Option<NaiveDate> {
    let raw = candidate.text("date_added")?;
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard similarity of the two tag sets; `None` when either has no tags
fn tag_overlap(a: &Candidate, b: &Candidate) -> Option<f64> {
    let tags_a: HashSet<String> = a.strings("tags").iter().map(|t| t.to_lowercase()).collect();
    let tags_b: HashSet<String> = b.strings("tags").iter().map(|t| t.to_lowercase()).collect();
    if tags_a.is_empty() || tags_b.is_empty() {
        return None;
    }
    let shared = tags_a.intersection(&tags_b).count() as f64;
    let union = tags_a.union(&tags_b).count() as f64;
    Some(shared / union)
}
