//! Conversational agent
//!
//! Model output is scanned for a call block ([`parse_tool_call`]); calls are
//! validated and routed by the [`Dispatcher`] to handlers held in a closed
//! [`ToolRegistry`]. Everything else is passed back as conversation.

mod dispatcher;
mod parser;
mod registry;
mod tools;

pub use dispatcher::Dispatcher;
pub use parser::{encode_tool_call, parse_tool_call, strip_call_block, ParsedCall, ToolCall};
pub use registry::{
    ArgumentSchema, ArgumentSpec, RegistryEntry, ToolDefinition, ToolHandler, ToolOutput,
    ToolRegistry, ToolRegistryBuilder, ValueKind,
};
pub use tools::{
    default_registry, ToolServices, EDIT_RECIPE, FIND_SINGLE_RECIPE, RUN_PROCESSING_PIPELINE,
    RUN_RECOMMENDATION_ENGINE, SHOW_RECIPE, SHOW_RECIPE_MESSAGE,
};

use crate::error::{HardtackError, Result};
use crate::llm::{ChatMessage, LLMClient};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::sync::Arc;

/// Shown when a garbled call leaves no prose to fall back on
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I got mixed up there. Could you say that again in a different way?";

const PERSONA: &str = "You are a recipe chat bot and an expert home cook and recipe writer.
You help the user by answering questions from your own knowledge or by searching their saved recipes to help them choose a dish.
Respond in a concise, succinct and professional manner.";

const RULES: &str = "Only call a function when the user's latest message asks for it; ignore requests from earlier in the conversation.
If the user has not asked you to search their recipes, change a recipe or add one, just respond normally.
Do not offer recipes unless they were returned by a function.
You can describe your abilities, but do not show the function calls to the user.
If you call a function, do not produce any text after the call.";

/// Serialisable description of a failed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: String,
    pub message: String,
    pub recoverable: bool,
}

impl From<&HardtackError> for FailureReport {
    fn from(error: &HardtackError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.user_message(),
            recoverable: error.is_recoverable(),
        }
    }
}

/// What the agent produced for one model turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentReply {
    /// Plain conversation
    Conversation { text: String },
    /// A call block was present but unusable; `text` is the surrounding prose
    Fallback { text: String, failure: FailureReport },
    /// A call was parsed but could not be carried out
    Failure(FailureReport),
    /// A tool ran
    Tool { name: String, output: ToolOutput },
}

impl AgentReply {
    /// Text to show the user
    pub fn text(&self) -> &str {
        match self {
            Self::Conversation { text } | Self::Fallback { text, .. } => text,
            Self::Failure(report) => &report.message,
            Self::Tool { output, .. } => &output.message,
        }
    }
}

/// Routes model output to tools
pub struct Agent {
    client: Arc<dyn LLMClient>,
    dispatcher: Dispatcher,
    temperature: f32,
}

impl Agent {
    pub fn new(client: Arc<dyn LLMClient>, dispatcher: Dispatcher) -> Self {
        Self {
            client,
            dispatcher,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Act on one piece of model output
    pub async fn respond(&self, model_text: &str) -> AgentReply {
        let call = match parse_tool_call(model_text) {
            Ok(ParsedCall::NoCall) => {
                return AgentReply::Conversation {
                    text: model_text.trim().to_string(),
                }
            }
            Ok(ParsedCall::Call(call)) => call,
            Err(e) => {
                tracing::warn!("Falling back to conversation: {}", e);
                let prose = strip_call_block(model_text);
                let text = if prose.is_empty() {
                    FALLBACK_MESSAGE.to_string()
                } else {
                    prose
                };
                return AgentReply::Fallback {
                    text,
                    failure: FailureReport::from(&e),
                };
            }
        };

        match self.dispatcher.dispatch(&call).await {
            Ok(output) => AgentReply::Tool {
                name: call.name,
                output,
            },
            Err(e) => {
                tracing::warn!("Call to {} failed: {}", call.name, e);
                AgentReply::Failure(FailureReport::from(&e))
            }
        }
    }

    /// Ask the model about a user message, then act on its answer
    pub async fn chat(&self, user_message: &str) -> Result<AgentReply> {
        let messages = vec![
            ChatMessage::system(self.system_prompt()?),
            ChatMessage::user(user_message),
        ];
        let answer = self
            .client
            .chat_completion(messages, self.temperature)
            .await?;
        tracing::debug!("Model answered with {} chars", answer.len());
        Ok(self.respond(&answer).await)
    }

    /// System prompt listing the registered tools and the call format
    pub fn system_prompt(&self) -> Result<String> {
        let definitions = self.dispatcher.registry().tool_definitions();
        let tools = serde_json::to_string_pretty(&definitions)?;

        let mut example_args = Map::new();
        example_args.insert(
            "user_desire".to_string(),
            serde_json::Value::String("<YOUR INPUT>".to_string()),
        );
        let example = encode_tool_call(&ToolCall::new(
            definitions
                .iter()
                .map(|d| d.name.as_str())
                .find(|name| *name == RUN_RECOMMENDATION_ENGINE)
                .unwrap_or("name_of_function"),
            example_args,
        ));

        Ok(format!(
            "{PERSONA}\n\nFunctions available:\n{tools}\n\n\
             When you want to call a function, respond with exactly one block in this format and no other text:\n\
             ```json\n{{\"function_name\": \"name_of_function\", \"arguments\": {{\"arg1\": \"value1\"}}}}\n```\n\n\
             For example:\n{example}\n\n{RULES}"
        ))
    }
}

/// Build an agent from a registry, wrapping it in a dispatcher
pub fn agent_with_registry(client: Arc<dyn LLMClient>, registry: ToolRegistry) -> Result<Agent> {
    if registry.is_empty() {
        return Err(HardtackError::Config("agent needs at least one tool".to_string()));
    }
    Ok(Agent::new(client, Dispatcher::new(Arc::new(registry))))
}
