//! Error types for hardtack

use thiserror::Error;

/// Result type alias using HardtackError
pub type Result<T> = std::result::Result<T, HardtackError>;

/// Error type alias for convenience
pub type Error = HardtackError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const UNAVAILABLE: i32 = 4;
}

/// Maximum length of a model-output snippet carried by `MalformedCall`
pub const SNIPPET_LIMIT: usize = 200;

/// Main error type for hardtack
#[derive(Debug, Error)]
pub enum HardtackError {
    #[error("Malformed function call: {snippet}")]
    MalformedCall { snippet: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Function '{function}' is missing required argument '{key}'")]
    MissingArgument { function: String, key: String },

    #[error("Function '{function}' argument '{key}' must be {expected}")]
    InvalidArgument {
        function: String,
        key: String,
        expected: String,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("No results to summarize")]
    EmptyResult,

    #[error("Tool '{name}' failed: {message}")]
    ToolFailed { name: String, message: String },

    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl HardtackError {
    /// Build a `MalformedCall` error, truncating the snippet on a char boundary
    pub fn malformed(snippet: &str) -> Self {
        let snippet = match snippet.char_indices().nth(SNIPPET_LIMIT) {
            Some((idx, _)) => format!("{}...", &snippet[..idx]),
            None => snippet.to_string(),
        };
        Self::MalformedCall { snippet }
    }

    pub fn missing_argument(function: &str, key: &str) -> Self {
        Self::MissingArgument {
            function: function.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid_argument(function: &str, key: &str, expected: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.to_string(),
            key: key.to_string(),
            expected: expected.into(),
        }
    }

    /// Stable snake_case identifier for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedCall { .. } => "malformed_call",
            Self::UnknownFunction { .. } => "unknown_function",
            Self::MissingArgument { .. } => "missing_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::InvalidQuery(_) => "invalid_query",
            Self::RetrievalUnavailable(_) => "retrieval_unavailable",
            Self::EmbeddingUnavailable(_) => "embedding_unavailable",
            Self::EmptyResult => "empty_result",
            Self::ToolFailed { .. } => "tool_failed",
            Self::RecipeNotFound(_) => "recipe_not_found",
            Self::Database(_) => "database",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Yaml(_) => "yaml",
            Self::Http(_) => "http",
            Self::Regex(_) => "regex",
            Self::Llm(_) => "llm",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "invalid_input",
            Self::ExternalError(_) => "external",
            Self::Other(_) => "other",
        }
    }

    /// Whether the caller can fix this by re-prompting the model
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedCall { .. }
                | Self::UnknownFunction { .. }
                | Self::MissingArgument { .. }
                | Self::InvalidArgument { .. }
                | Self::InvalidQuery(_)
                | Self::EmptyResult
                | Self::RecipeNotFound(_)
        )
    }

    /// Whether an orchestrator may retry the operation that produced this error
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RetrievalUnavailable(_) | Self::EmbeddingUnavailable(_)
        )
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedCall { .. } => {
                "I tried to run an action but the request was garbled. Could you rephrase?"
                    .to_string()
            }
            Self::UnknownFunction { name } => {
                format!("I can't do '{}' - that action isn't available.", name)
            }
            Self::MissingArgument { function, key } => {
                format!("To run {} I still need '{}'.", function, key)
            }
            Self::InvalidArgument {
                function,
                key,
                expected,
            } => format!(
                "The value given for '{}' in {} should be {}.",
                key, function, expected
            ),
            Self::InvalidQuery(reason) => format!("I couldn't search for that: {}.", reason),
            Self::RetrievalUnavailable(_) => {
                "The recipe index is unavailable right now. Please try again shortly.".to_string()
            }
            Self::EmbeddingUnavailable(_) => {
                "The search service is unavailable right now. Please try again shortly."
                    .to_string()
            }
            Self::EmptyResult => "I couldn't find any recipes matching that.".to_string(),
            Self::ToolFailed { message, .. } => message.clone(),
            Self::RecipeNotFound(id) => format!("I couldn't find a recipe with id {}.", id),
            _ => "Something went wrong while handling that request.".to_string(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RecipeNotFound(_) | Self::EmptyResult => exit_codes::NOT_FOUND,
            Self::MalformedCall { .. }
            | Self::UnknownFunction { .. }
            | Self::MissingArgument { .. }
            | Self::InvalidArgument { .. }
            | Self::InvalidQuery(_)
            | Self::InvalidInput(_)
            | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::RetrievalUnavailable(_) | Self::EmbeddingUnavailable(_) => {
                exit_codes::UNAVAILABLE
            }
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
