//! Recipe commands: show, edit and add

use crate::app::{AddArgs, EditArgs, OutputFormat, ShowArgs};
use crate::output::{format_recipe, format_tool_output, FormatOptions};
use crate::services::Services;
use anyhow::Result;
use hardtack_core::agent::{EDIT_RECIPE, RUN_PROCESSING_PIPELINE};
use hardtack_core::{HardtackError, Source, ToolCall, ToolOutput};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub async fn run_show(
    args: ShowArgs,
    services: &Services,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<()> {
    let recipe = services
        .store
        .get_recipe(&args.id)?
        .ok_or(HardtackError::RecipeNotFound(args.id))?;
    print!("{}", format_recipe(&recipe, None, format, options));
    Ok(())
}

/// Parse a command-line value as JSON, taking bare words as strings
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn run_edit(
    args: EditArgs,
    services: &Services,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<()> {
    let mut arguments = Map::new();
    arguments.insert("recipe_id".to_string(), Value::String(args.id));
    arguments.insert("field".to_string(), Value::String(args.field));
    arguments.insert("value".to_string(), parse_value(&args.value));

    let output = services
        .dispatcher()?
        .dispatch(&ToolCall::new(EDIT_RECIPE, arguments))
        .await?;
    print!("{}", format_tool_output(&output, format, options));
    Ok(())
}

/// Add a recipe; URLs go through the pipeline tool, local files straight to the pipeline
pub async fn run_add(
    args: AddArgs,
    services: &Services,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<()> {
    if format == OutputFormat::Cli {
        eprintln!("Processing recipe...");
    }

    let output = if args.file {
        let recipe = services
            .pipeline()
            .run(&Source::File(PathBuf::from(&args.location)))
            .await?;
        ToolOutput::recipe(format!("Added {} to your recipes.", recipe.dish_name), recipe)
    } else {
        let mut arguments = Map::new();
        arguments.insert("source_type".to_string(), Value::String("url".to_string()));
        arguments.insert("url".to_string(), Value::String(args.location));
        services
            .dispatcher()?
            .dispatch(&ToolCall::new(RUN_PROCESSING_PIPELINE, arguments))
            .await?
    };
    print!("{}", format_tool_output(&output, format, options));
    Ok(())
}
