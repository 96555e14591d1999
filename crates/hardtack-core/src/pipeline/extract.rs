//! Markup stripping and structured recipe extraction

use crate::error::{HardtackError, Result};
use crate::llm::{extract_json_object, ChatMessage, LLMClient};
use crate::recipe::Recipe;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

lazy_static! {
    static ref HIDDEN_BLOCK_RE: Regex =
        Regex::new(r"(?is)<(script|style|noscript|template)\b[^>]*>.*?</(script|style|noscript|template)\s*>").unwrap();
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref BLOCK_BREAK_RE: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|section|article|ul|ol)\s*>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"[ \t\u{a0}]+").unwrap();
    static ref BLANK_LINES_RE: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref MINUTES_RE: Regex = Regex::new(r"(?i)(\d+)\s*(h|hr|hrs|hour|hours)?").unwrap();
}

/// Reduce an HTML page to its visible text
///
/// Drops scripts, styles and comments, turns block ends into line breaks,
/// decodes the common entities and collapses whitespace.
pub fn clean_html_text(html: &str) -> String {
    let text = HIDDEN_BLOCK_RE.replace_all(html, " ");
    let text = COMMENT_RE.replace_all(&text, " ");
    let text = BLOCK_BREAK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = SPACES_RE.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_LINES_RE
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&rsquo;", "'")
        .replace("&frac12;", "1/2")
        .replace("&frac14;", "1/4")
        .replace("&amp;", "&")
}

/// Turns cleaned page text into a recipe record
#[async_trait]
pub trait RecipeExtractor: Send + Sync {
    /// Extract the recipe; `id`, `date_added` and `source_url` are left for the caller
    async fn extract(&self, text: &str) -> Result<Recipe>;
}

/// Extractor backed by a chat-completion model
pub struct LlmRecipeExtractor {
    client: Arc<dyn LLMClient>,
    temperature: f32,
}

const EXTRACTION_PROMPT: &str = r#"You are an expert chef and recipe writer.
The user message is the text of a web page containing one recipe. Extract it as a single JSON object with these keys:
- "dish_name": string
- "ingredients": object mapping each ingredient name to [quantity, preparation] (use "" when unknown)
- "cooking_steps": list of strings, in order
- "active_time": minutes of hands-on work (integer or null)
- "total_time": minutes from start to finish (integer or null)
- "source_name": publication or site name (string or null)
- "author": string or null
- "shopping_list": ingredient names without quantities
- "tags": 12 to 15 tags covering cuisine, flavor, dish type, cooking method, meal type, dietary notes, difficulty and season. Do not repeat the dish name or plain ingredient names.
- "recipe_notes": practical tips on substitutions, technique or serving
Only use information present in the text. Return only the JSON object."#;

impl LlmRecipeExtractor {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl RecipeExtractor for LlmRecipeExtractor {
    async fn extract(&self, text: &str) -> Result<Recipe> {
        let messages = vec![
            ChatMessage::system(EXTRACTION_PROMPT),
            ChatMessage::user(text),
        ];
        let reply = self
            .client
            .chat_completion(messages, self.temperature)
            .await?;
        parse_extraction(&reply)
    }
}

#[derive(Debug, Deserialize)]
struct ExtractedRecipe {
    #[serde(default)]
    dish_name: String,
    #[serde(default)]
    ingredients: BTreeMap<String, Value>,
    #[serde(default)]
    cooking_steps: Vec<String>,
    #[serde(default)]
    active_time: Value,
    #[serde(default)]
    total_time: Value,
    #[serde(default)]
    source_name: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    shopping_list: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    recipe_notes: Vec<String>,
}

/// Parse a model reply into a recipe
pub(crate) fn parse_extraction(reply: &str) -> Result<Recipe> {
    let json = extract_json_object(reply)
        .ok_or_else(|| HardtackError::Llm("extraction reply contains no JSON object".to_string()))?;
    let extracted: ExtractedRecipe = serde_json::from_str(json)
        .map_err(|e| HardtackError::Llm(format!("extraction reply is not a recipe: {}", e)))?;

    let dish_name = extracted.dish_name.trim().to_string();
    if dish_name.is_empty() {
        return Err(HardtackError::Llm(
            "no recipe found in the page text".to_string(),
        ));
    }

    let ingredients: BTreeMap<String, Vec<String>> = extracted
        .ingredients
        .into_iter()
        .map(|(name, detail)| (name, ingredient_detail(detail)))
        .collect();
    let shopping_list = if extracted.shopping_list.is_empty() {
        ingredients.keys().cloned().collect()
    } else {
        extracted.shopping_list
    };

    Ok(Recipe {
        dish_name,
        ingredients,
        cooking_steps: extracted.cooking_steps,
        active_time: minutes(&extracted.active_time),
        total_time: minutes(&extracted.total_time),
        source_name: non_empty(extracted.source_name),
        author: non_empty(extracted.author),
        shopping_list,
        tags: extracted.tags,
        recipe_notes: extracted.recipe_notes,
        ..Default::default()
    })
}

fn ingredient_detail(detail: Value) -> Vec<String> {
    match detail {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Minutes from a number or a phrase like "1 hour 15 minutes"
fn minutes(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_f64().filter(|m| *m >= 0.0).map(|m| m.round() as u32),
        Value::String(s) => {
            let total: u32 = MINUTES_RE
                .captures_iter(s)
                .filter_map(|caps| {
                    let amount: u32 = caps.get(1)?.as_str().parse().ok()?;
                    Some(if caps.get(2).is_some() { amount * 60 } else { amount })
                })
                .sum();
            (total > 0).then_some(total)
        }
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
