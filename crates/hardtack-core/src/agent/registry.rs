//! Function registry: the closed set of tools the model may call

use crate::error::{HardtackError, Result};
use crate::recipe::Recipe;
use crate::search::Summary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// JSON kind an argument must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl ValueKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    fn json_type(&self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Array => Some("array"),
            Self::Object => Some("object"),
            Self::Any => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
            Self::Any => "any value",
        };
        f.write_str(name)
    }
}

/// One declared argument
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ValueKind,
    pub required: bool,
    pub description: String,
}

impl ArgumentSpec {
    pub fn required(name: &str, kind: ValueKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ValueKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Ordered argument declarations of a tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    specs: Vec<ArgumentSpec>,
}

impl ArgumentSchema {
    pub fn new(specs: Vec<ArgumentSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[ArgumentSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ArgumentSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// JSON-schema object describing the arguments
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.specs {
            let mut property = Map::new();
            if let Some(kind) = spec.kind.json_type() {
                property.insert("type".into(), Value::String(kind.to_string()));
            }
            property.insert(
                "description".into(),
                Value::String(spec.description.clone()),
            );
            properties.insert(spec.name.clone(), Value::Object(property));
        }
        let required: Vec<Value> = self
            .specs
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| Value::String(spec.name.clone()))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool definition as advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a successful tool invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    /// Text to show the user
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Recipe>,
}

impl ToolOutput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            summary: None,
            recipe: None,
        }
    }

    pub fn summary(summary: Summary) -> Self {
        Self {
            message: summary.text.clone(),
            summary: Some(summary),
            recipe: None,
        }
    }

    pub fn recipe(message: impl Into<String>, recipe: Recipe) -> Self {
        Self {
            message: message.into(),
            summary: None,
            recipe: Some(recipe),
        }
    }
}

/// Callable behind a registry entry
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with arguments already validated against its schema
    async fn call(&self, arguments: &Map<String, Value>) -> Result<ToolOutput>;
}

/// A registered tool
#[derive(Clone)]
pub struct RegistryEntry {
    pub name: String,
    pub description: String,
    pub schema: ArgumentSchema,
    pub handler: Arc<dyn ToolHandler>,
}

impl RegistryEntry {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Immutable name -> tool mapping
#[derive(Debug)]
pub struct ToolRegistry {
    entries: Vec<RegistryEntry>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Exact-name lookup
    pub fn lookup(&self, name: &str) -> Option<&RegistryEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Definitions of every tool, in registration order
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(RegistryEntry::definition).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects entries before the registry is frozen
#[derive(Default)]
pub struct ToolRegistryBuilder {
    entries: Vec<RegistryEntry>,
}

impl ToolRegistryBuilder {
    pub fn register(
        mut self,
        name: &str,
        description: &str,
        schema: ArgumentSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        self.entries.push(RegistryEntry {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler,
        });
        self
    }

    /// Freeze the registry, rejecting empty or duplicate names
    pub fn build(self) -> Result<ToolRegistry> {
        let mut by_name = HashMap::with_capacity(self.entries.len());
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(HardtackError::Config("tool name is empty".to_string()));
            }
            if by_name.insert(entry.name.clone(), i).is_some() {
                return Err(HardtackError::Config(format!(
                    "tool '{}' registered twice",
                    entry.name
                )));
            }
        }
        Ok(ToolRegistry {
            entries: self.entries,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, arguments: &Map<String, Value>) -> Result<ToolOutput> {
            Ok(ToolOutput::message(Value::Object(arguments.clone()).to_string()))
        }
    }

    fn schema() -> ArgumentSchema {
        ArgumentSchema::new(vec![
            ArgumentSpec::required("recipe_id", ValueKind::String, "Recipe id"),
            ArgumentSpec::optional("top_k", ValueKind::Integer, "How many"),
            ArgumentSpec::required("value", ValueKind::Any, "New value"),
        ])
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = ToolRegistry::builder()
            .register("show_recipe", "Show a recipe", schema(), Arc::new(Echo))
            .build()
            .unwrap();
        assert!(registry.lookup("show_recipe").is_some());
        assert!(registry.lookup("Show_Recipe").is_none());
        assert!(registry.lookup("show_recipe ").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = ToolRegistry::builder()
            .register("a", "first", ArgumentSchema::default(), Arc::new(Echo))
            .register("a", "second", ArgumentSchema::default(), Arc::new(Echo))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_tool_definitions_in_order() {
        let registry = ToolRegistry::builder()
            .register("b_tool", "B", schema(), Arc::new(Echo))
            .register("a_tool", "A", ArgumentSchema::default(), Arc::new(Echo))
            .build()
            .unwrap();
        let defs = registry.tool_definitions();
        assert_eq!(defs[0].name, "b_tool");
        assert_eq!(defs[1].name, "a_tool");
        assert_eq!(
            defs[0].input_schema,
            json!({
                "type": "object",
                "properties": {
                    "recipe_id": {"type": "string", "description": "Recipe id"},
                    "top_k": {"type": "integer", "description": "How many"},
                    "value": {"description": "New value"}
                },
                "required": ["recipe_id", "value"]
            })
        );
        let wire = serde_json::to_value(&defs[1]).unwrap();
        assert!(wire.get("inputSchema").is_some());
    }

    #[test]
    fn test_value_kinds() {
        assert!(ValueKind::Integer.matches(&json!(3)));
        assert!(!ValueKind::Integer.matches(&json!(3.5)));
        assert!(ValueKind::Number.matches(&json!(3)));
        assert!(!ValueKind::String.matches(&json!(3)));
        assert!(ValueKind::Any.matches(&Value::Null));
        assert_eq!(ValueKind::Integer.to_string(), "an integer");
    }
}
