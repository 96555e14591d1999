//! Summaries of ranked results

use super::RankedResult;
use crate::error::{HardtackError, Result};
use serde::{Deserialize, Serialize};

/// User-facing text plus the recipes it mentions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    /// Ids of the recipes the text draws on, in rank order
    pub cited_recipe_ids: Vec<String>,
}

impl Summary {
    /// Summary for a search that matched nothing
    pub fn no_matches() -> Self {
        Self {
            text: "I couldn't find any recipes matching that.".to_string(),
            cited_recipe_ids: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cited_recipe_ids.is_empty()
    }
}

/// Summarize the first `k` ranked results
///
/// The text is built only from the cited results' metadata.
pub fn summarize(results: &[RankedResult], k: usize) -> Result<Summary> {
    if results.is_empty() {
        return Err(HardtackError::EmptyResult);
    }
    if k == 0 || k > results.len() {
        return Err(HardtackError::InvalidInput(format!(
            "cannot summarize {} of {} results",
            k,
            results.len()
        )));
    }

    let cited = &results[..k];
    let mut text = if k == 1 {
        "Here is the best match:\n".to_string()
    } else {
        format!("Here are the top {} matches:\n", k)
    };
    for result in cited {
        text.push_str(&format!("{}. {}\n", result.rank, describe(result)));
    }

    Ok(Summary {
        text: text.trim_end().to_string(),
        cited_recipe_ids: cited.iter().map(|r| r.recipe_id().to_string()).collect(),
    })
}

/// Summarize a single result
pub fn summarize_one(result: &RankedResult) -> Summary {
    Summary {
        text: format!("I found {}", describe(result)),
        cited_recipe_ids: vec![result.recipe_id().to_string()],
    }
}

fn describe(result: &RankedResult) -> String {
    let c = &result.candidate;
    let mut line = c.text("dish_name").unwrap_or(c.recipe_id.as_str()).to_string();

    let origin: Vec<String> = [
        c.text("source_name").map(str::to_string),
        c.text("author").map(|a| format!("by {}", a)),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !origin.is_empty() {
        line.push_str(&format!(" ({})", origin.join(", ")));
    }

    let mut details = Vec::new();
    if let Some(active) = c.metadata.get("active_time").and_then(|v| v.as_u64()) {
        details.push(format!("{} min active", active));
    }
    if let Some(total) = c.metadata.get("total_time").and_then(|v| v.as_u64()) {
        details.push(format!("{} min total", total));
    }
    if let Some(rating) = c.metadata.get("rating").and_then(|v| v.as_f64()) {
        details.push(format!("rated {}/5", rating));
    }
    if !details.is_empty() {
        line.push_str(&format!(" - {}", details.join(", ")));
    }

    let tags = c.strings("tags");
    if !tags.is_empty() {
        line.push_str(&format!(". Tags: {}", tags.join(", ")));
    }
    line
}
