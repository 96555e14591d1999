//! Hardtack CLI
//!
//! Ask about, search, edit and add to your saved recipes.

use anyhow::Result;
use clap::Parser;
use hardtack_core::error::exit_codes;
use hardtack_core::HardtackError;
use std::process::ExitCode;

mod app;
mod commands;
mod output;
mod services;

use app::{Cli, Commands};
use output::FormatOptions;
use services::Services;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => report(&e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let services = Services::open()?;
    let options = FormatOptions::detect();
    let format = cli.format;

    match cli.command {
        Commands::Ask(args) => commands::agent::run_ask(args, &services, format, &options).await,
        Commands::Chat(args) => commands::agent::run_chat(args, &services, format, &options).await,
        Commands::Find(args) => {
            commands::search::run_find(args, &services, format, &options).await
        }
        Commands::Recommend(args) => {
            commands::search::run_recommend(args, &services, format, &options).await
        }
        Commands::Show(args) => commands::recipe::run_show(args, &services, format, &options).await,
        Commands::Edit(args) => commands::recipe::run_edit(args, &services, format, &options).await,
        Commands::Add(args) => commands::recipe::run_add(args, &services, format, &options).await,
        Commands::Tools => commands::tools::run(&services, format, &options).await,
        Commands::Status => commands::status::run(&services, format).await,
    }
}

fn report(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<HardtackError>() {
        Some(e) => {
            let friendly = e.is_recoverable()
                || e.is_transient()
                || matches!(e, HardtackError::ToolFailed { .. });
            if friendly {
                eprintln!("Error: {}", e.user_message());
            } else {
                eprintln!("Error: {}", e);
            }
            tracing::debug!("{} error: {:?}", e.kind(), e);
            ExitCode::from(e.exit_code() as u8)
        }
        None => {
            eprintln!("Error: {:#}", error);
            ExitCode::from(exit_codes::GENERAL_ERROR as u8)
        }
    }
}
