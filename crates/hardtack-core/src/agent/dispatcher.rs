//! Validation and routing of parsed calls

use super::parser::ToolCall;
use super::registry::{RegistryEntry, ToolOutput, ToolRegistry};
use crate::error::{HardtackError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Validates calls against the registry and runs the matching handler once
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Check a call without running it
    pub fn validate(&self, call: &ToolCall) -> Result<&RegistryEntry> {
        let entry = self
            .registry
            .lookup(&call.name)
            .ok_or_else(|| HardtackError::UnknownFunction {
                name: call.name.clone(),
            })?;

        for spec in entry.schema.specs().iter().filter(|s| s.required) {
            match call.arguments.get(&spec.name) {
                None | Some(Value::Null) => {
                    return Err(HardtackError::missing_argument(&call.name, &spec.name));
                }
                Some(_) => {}
            }
        }

        for (key, value) in &call.arguments {
            match entry.schema.get(key) {
                Some(spec) => {
                    if !value.is_null() && !spec.kind.matches(value) {
                        return Err(HardtackError::invalid_argument(
                            &call.name,
                            key,
                            spec.kind.to_string(),
                        ));
                    }
                }
                None => tracing::warn!("Ignoring undeclared argument '{}' for {}", key, call.name),
            }
        }

        Ok(entry)
    }

    /// Validate and invoke the handler exactly once
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolOutput> {
        let entry = self.validate(call)?;
        tracing::info!("Dispatching {}", call.name);
        entry.handler.call(&call.arguments).await
    }
}
