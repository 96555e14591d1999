//! Agent commands: act on model output, or chat through the model

use crate::app::{OutputFormat, TextArgs};
use crate::output::{format_reply, FormatOptions};
use crate::services::Services;
use anyhow::Result;
use futures::StreamExt;
use hardtack_core::stream_words;
use std::io::Write;

pub async fn run_ask(
    args: TextArgs,
    services: &Services,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<()> {
    let agent = services.agent()?;
    let reply = agent.respond(&args.text.join(" ")).await;
    print!("{}", format_reply(&reply, format, options));
    Ok(())
}

pub async fn run_chat(
    args: TextArgs,
    services: &Services,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<()> {
    let agent = services.agent()?;
    let reply = agent.chat(&args.text.join(" ")).await?;
    tracing::debug!("LLM service: {:?}", services.client.metrics());
    let rendered = format_reply(&reply, format, options);

    if format == OutputFormat::Json {
        print!("{}", rendered);
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    let mut words = std::pin::pin!(stream_words(&rendered));
    while let Some(word) = words.next().await {
        stdout.write_all(word.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}
