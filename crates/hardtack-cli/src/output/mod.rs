//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use hardtack_core::search::RankedResult;
use hardtack_core::{AgentReply, Recipe, Summary, ToolDefinition, ToolOutput};
use std::io::IsTerminal;

/// Format options
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Emit ANSI colors
    pub color: bool,
}

impl FormatOptions {
    /// Colors only when stdout is a terminal and NO_COLOR is unset
    pub fn detect() -> Self {
        Self {
            color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

pub fn format_reply(reply: &AgentReply, format: OutputFormat, options: &FormatOptions) -> String {
    match format {
        OutputFormat::Json => json::format_value(reply),
        OutputFormat::Cli => terminal::format_reply(reply, options),
    }
}

/// Format a summary followed by the ranked results it was drawn from
pub fn format_ranked(
    summary: &Summary,
    results: &[RankedResult],
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_value(&serde_json::json!({
            "summary": summary,
            "results": results,
        })),
        OutputFormat::Cli => terminal::format_ranked(summary, results, options),
    }
}

pub fn format_recipe(
    recipe: &Recipe,
    message: Option<&str>,
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_value(recipe),
        OutputFormat::Cli => {
            let mut out = String::new();
            if let Some(message) = message {
                out.push_str(message);
                out.push_str("\n\n");
            }
            out.push_str(&terminal::format_recipe(recipe, options));
            out
        }
    }
}

pub fn format_tools(
    definitions: &[ToolDefinition],
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_value(definitions),
        OutputFormat::Cli => terminal::format_tools(definitions, options),
    }
}

pub fn format_tool_output(output: &ToolOutput, format: OutputFormat, options: &FormatOptions) -> String {
    match format {
        OutputFormat::Json => json::format_value(output),
        OutputFormat::Cli => match output.recipe {
            Some(ref recipe) => format_recipe(recipe, Some(&output.message), format, options),
            None => format!("{}\n", output.message),
        },
    }
}
