//! Recipe record and its searchable projection

use crate::error::{HardtackError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Metadata map carried by index hits and candidates
pub type Metadata = BTreeMap<String, Value>;

/// A stored recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Recipe {
    /// Stable identifier (hex)
    pub id: String,
    pub dish_name: String,
    /// Ingredient name -> [quantity, preparation]
    #[serde(default)]
    pub ingredients: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub cooking_steps: Vec<String>,
    /// Minutes of active work
    #[serde(default)]
    pub active_time: Option<u32>,
    /// Minutes from start to finish
    #[serde(default)]
    pub total_time: Option<u32>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Ingredient names without quantities
    #[serde(default)]
    pub shopping_list: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub recipe_notes: Vec<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
    /// 0-5, `None` until the dish has been cooked and rated
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub cooked_already: bool,
    /// ISO-8601 date (YYYY-MM-DD)
    #[serde(default)]
    pub date_added: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Fields that `edit_recipe` may change, with the JSON shape each accepts
pub const EDITABLE_FIELDS: &[(&str, FieldShape)] = &[
    ("dish_name", FieldShape::Text),
    ("ingredients", FieldShape::Ingredients),
    ("cooking_steps", FieldShape::TextList),
    ("active_time", FieldShape::Minutes),
    ("total_time", FieldShape::Minutes),
    ("source_name", FieldShape::OptionalText),
    ("author", FieldShape::OptionalText),
    ("shopping_list", FieldShape::TextList),
    ("tags", FieldShape::TextList),
    ("recipe_notes", FieldShape::TextList),
    ("user_notes", FieldShape::OptionalText),
    ("user_rating", FieldShape::Rating),
    ("cooked_already", FieldShape::Flag),
    ("date_added", FieldShape::OptionalText),
    ("source_url", FieldShape::OptionalText),
];

/// Accepted JSON shape of an editable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Text,
    OptionalText,
    TextList,
    Ingredients,
    Minutes,
    Rating,
    Flag,
}

impl FieldShape {
    /// Human-readable description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Text => "a non-empty string",
            Self::OptionalText => "a string or null",
            Self::TextList => "a list of strings",
            Self::Ingredients => "an object mapping ingredient to a list of strings",
            Self::Minutes => "a non-negative integer or null",
            Self::Rating => "a number between 0 and 5, or null",
            Self::Flag => "a boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            Self::OptionalText => value.is_null() || value.is_string(),
            Self::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Ingredients => value.as_object().is_some_and(|map| {
                map.values().all(|v| {
                    v.as_array()
                        .is_some_and(|items| items.iter().all(Value::is_string))
                })
            }),
            Self::Minutes => {
                value.is_null() || value.as_u64().is_some_and(|m| m <= u32::MAX as u64)
            }
            Self::Rating => {
                value.is_null() || value.as_f64().is_some_and(|r| (0.0..=5.0).contains(&r))
            }
            Self::Flag => value.is_boolean(),
        }
    }
}

/// Look up the shape of an editable field
pub fn editable_field(name: &str) -> Option<FieldShape> {
    EDITABLE_FIELDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, shape)| *shape)
}

impl Recipe {
    /// Project the searchable fields into index metadata
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("dish_name".into(), Value::String(self.dish_name.clone()));
        meta.insert("tags".into(), string_list(&self.tags));
        meta.insert("shopping_list".into(), string_list(&self.shopping_list));
        meta.insert("source_name".into(), optional_string(&self.source_name));
        meta.insert("author".into(), optional_string(&self.author));
        meta.insert(
            "active_time".into(),
            self.active_time.map(Value::from).unwrap_or(Value::Null),
        );
        meta.insert(
            "total_time".into(),
            self.total_time.map(Value::from).unwrap_or(Value::Null),
        );
        meta.insert(
            "rating".into(),
            self.user_rating.map(Value::from).unwrap_or(Value::Null),
        );
        meta.insert("cooked".into(), Value::Bool(self.cooked_already));
        meta.insert("date_added".into(), optional_string(&self.date_added));
        meta
    }

    /// Text fed to the embedder for this recipe
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![self.dish_name.clone()];
        if !self.tags.is_empty() {
            parts.push(format!("tags: {}", self.tags.join(", ")));
        }
        if !self.shopping_list.is_empty() {
            parts.push(format!("ingredients: {}", self.shopping_list.join(", ")));
        }
        let source: Vec<&str> = [self.source_name.as_deref(), self.author.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !source.is_empty() {
            parts.push(format!("source: {}", source.join(" / ")));
        }
        parts.join("\n")
    }

    /// Replace one existing field, validating the value's shape
    ///
    /// Never adds keys: unknown or non-editable fields are rejected.
    pub fn apply_update(&mut self, field: &str, value: &Value) -> Result<()> {
        let shape = editable_field(field).ok_or_else(|| {
            HardtackError::invalid_argument("edit_recipe", "field", "an existing recipe field")
        })?;
        if !shape.accepts(value) {
            return Err(HardtackError::invalid_argument(
                "edit_recipe",
                "value",
                format!("{} for field '{}'", shape.describe(), field),
            ));
        }

        let mut object: Map<String, Value> = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => {
                return Err(HardtackError::InvalidInput(
                    "recipe did not serialize to an object".into(),
                ))
            }
        };
        object.insert(field.to_string(), value.clone());
        *self = serde_json::from_value(Value::Object(object))?;
        Ok(())
    }
}

fn string_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn optional_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}
