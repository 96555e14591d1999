//! Search commands

use crate::app::{OutputFormat, SearchArgs};
use crate::output::{format_ranked, FormatOptions};
use crate::services::Services;
use anyhow::Result;
use hardtack_core::search::summarize_one;
use hardtack_core::{QueryContext, Summary};

fn build_context(args: &SearchArgs) -> QueryContext {
    let mut context = QueryContext::default();
    if let Some(limit) = args.limit {
        context = context.with_top_k(limit);
    }
    if let Some(min_score) = args.min_score {
        context = context.with_min_score(min_score);
    }
    context
}

/// Single best match
pub async fn run_find(
    args: SearchArgs,
    services: &Services,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<()> {
    let query = args.query.join(" ");
    let results = services.engine.search(&query, &build_context(&args)).await?;
    let best = &results[..results.len().min(1)];
    let summary = best
        .first()
        .map(summarize_one)
        .unwrap_or_else(Summary::no_matches);

    print!("{}", format_ranked(&summary, best, format, options));
    Ok(())
}

/// Summary of the top matches plus the full ranking
pub async fn run_recommend(
    args: SearchArgs,
    services: &Services,
    format: OutputFormat,
    options: &FormatOptions,
) -> Result<()> {
    let query = args.query.join(" ");
    let results = services.engine.search(&query, &build_context(&args)).await?;
    let summary = services.engine.summarize_ranked(&results)?;

    print!("{}", format_ranked(&summary, &results, format, options));
    Ok(())
}
