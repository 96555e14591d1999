//! Query planning: which recipe fields to search, and how to filter
//!
//! A chat model picks search terms per field (dish name, tags, ingredients,
//! source) and an optional rating condition. Without a model, or when it
//! fails, the inline `field:value` syntax is the plan.

use super::filter::{parse_inline_filters, CompareOp, FieldFilter};
use super::query::request_preferences;
use crate::error::{HardtackError, Result};
use crate::llm::{extract_json_object, ChatMessage, LLMClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What to search for, derived from one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Text to embed
    pub text: String,
    /// Hard filters keyed by metadata field
    pub filters: BTreeMap<String, FieldFilter>,
    /// Soft field/value preferences for the ranker
    pub preferences: Vec<(String, Value)>,
}

impl QueryPlan {
    /// Plan read from the inline syntax alone
    pub fn inline(request_text: &str) -> Self {
        let (text, filters) = parse_inline_filters(request_text);
        Self {
            preferences: request_preferences(request_text),
            text,
            filters,
        }
    }
}

/// Turns request text into a query plan
#[async_trait]
pub trait QueryPlanner: Send + Sync {
    async fn plan(&self, request_text: &str) -> Result<QueryPlan>;
}

/// Offline planner over the inline `field:value` syntax
#[derive(Debug, Clone, Copy, Default)]
pub struct InlinePlanner;

#[async_trait]
impl QueryPlanner for InlinePlanner {
    async fn plan(&self, request_text: &str) -> Result<QueryPlan> {
        Ok(QueryPlan::inline(request_text))
    }
}

const PLANNING_PROMPT: &str = r#"You are an expert chef helping a user search their saved recipes.
Decide which recipe fields to search and with which terms. Searchable fields:
- "dish_name": names of dishes, only when the user names a dish
- "tags": meal types, dish types, flavors, cuisines, cooking styles or equipment
- "shopping_list": ingredients, only ones the user mentions
- "source_author": website, book, publication or person the recipe came from
Use your knowledge of cooking to add closely related tags.
Filtering by the user's past rating (0-5, null when never cooked) is available as
"rating": [value, operator] with operator one of equal, not_equal, greater_than,
greater_or_equal, less_than, less_or_equal, is_null. Use [null, "is_null"] for dishes
not cooked yet and [0, "greater_or_equal"] for dishes already cooked.
Leave a list empty when the field should not be searched.
Example for "desserts with walnuts and brown sugar I rated at least 3":
{"dish_name": [], "tags": ["dessert", "sweet"], "shopping_list": ["walnuts", "brown sugar"], "source_author": [], "rating": [3, "greater_or_equal"]}
Return only the JSON object."#;

/// Planner asking a chat model for field queries
pub struct LlmQueryPlanner {
    client: Arc<dyn LLMClient>,
    temperature: f32,
}

impl LlmQueryPlanner {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            temperature: 0.3,
        }
    }
}

#[async_trait]
impl QueryPlanner for LlmQueryPlanner {
    async fn plan(&self, request_text: &str) -> Result<QueryPlan> {
        let inline = QueryPlan::inline(request_text);
        if inline.text.trim().is_empty() {
            return Ok(inline);
        }

        let messages = vec![
            ChatMessage::system(PLANNING_PROMPT),
            ChatMessage::user(inline.text.clone()),
        ];
        let reply = self
            .client
            .chat_completion(messages, self.temperature)
            .await?;
        let plan = parse_plan(&reply, inline)?;
        tracing::debug!(
            "Planned query '{}' with {} preferences, {} filters",
            plan.text,
            plan.preferences.len(),
            plan.filters.len()
        );
        Ok(plan)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlannedFields {
    dish_name: Vec<String>,
    tags: Vec<String>,
    shopping_list: Vec<String>,
    source_author: Vec<String>,
    rating: Vec<Value>,
}

/// Merge the model's field queries into the inline plan
///
/// Inline filters win over a planned rating filter.
fn parse_plan(reply: &str, inline: QueryPlan) -> Result<QueryPlan> {
    let json = extract_json_object(reply)
        .ok_or_else(|| HardtackError::Llm("query plan is not JSON".to_string()))?;
    let fields: PlannedFields = serde_json::from_str(json)
        .map_err(|e| HardtackError::Llm(format!("invalid query plan: {}", e)))?;

    let mut terms = Vec::new();
    let mut preferences = Vec::new();
    let groups: [(&[String], &[&str]); 4] = [
        (&fields.dish_name, &["dish_name"]),
        (&fields.tags, &["tags"]),
        (&fields.shopping_list, &["shopping_list"]),
        (&fields.source_author, &["source_name", "author"]),
    ];
    for (values, targets) in groups {
        for term in values.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            terms.push(term.to_string());
            for target in targets {
                preferences.push((target.to_string(), Value::String(term.to_string())));
            }
        }
    }

    let mut filters = inline.filters;
    if let Some(filter) = rating_filter(&fields.rating) {
        filters.entry("rating".to_string()).or_insert(filter);
    }

    if terms.is_empty() {
        return Ok(QueryPlan {
            text: inline.text,
            filters,
            preferences: inline.preferences,
        });
    }
    Ok(QueryPlan {
        text: terms.join(", "),
        filters,
        preferences,
    })
}

/// `[value, operator]` as produced by the planner
fn rating_filter(rating: &[Value]) -> Option<FieldFilter> {
    let operator = rating.get(1)?.as_str()?;
    if operator == "is_null" {
        return Some(FieldFilter::IsNull);
    }
    let op = match operator {
        "equal" => CompareOp::Equal,
        "not_equal" | "no_equal" => CompareOp::NotEqual,
        "greater_than" => CompareOp::GreaterThan,
        "greater_or_equal" => CompareOp::GreaterOrEqual,
        "less_than" => CompareOp::LessThan,
        "less_or_equal" => CompareOp::LessOrEqual,
        other => {
            tracing::debug!("Ignoring unknown rating operator '{}'", other);
            return None;
        }
    };
    let value = rating.first()?.as_f64().filter(|v| v.is_finite())?;
    Some(FieldFilter::Compare(op, value))
}
