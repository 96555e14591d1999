//! Tools command

use crate::app::OutputFormat;
use crate::output::{format_tools, FormatOptions};
use crate::services::Services;
use anyhow::Result;

pub async fn run(services: &Services, format: OutputFormat, options: &FormatOptions) -> Result<()> {
    let definitions = services.registry()?.tool_definitions();
    print!("{}", format_tools(&definitions, format, options));
    Ok(())
}
