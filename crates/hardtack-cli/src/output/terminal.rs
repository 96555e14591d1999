//! Terminal output formatter

use super::FormatOptions;
use hardtack_core::search::RankedResult;
use hardtack_core::{AgentReply, Recipe, Summary, ToolDefinition};
use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorSpec, WriteColor};

fn render(options: &FormatOptions, write: impl FnOnce(&mut Buffer) -> io::Result<()>) -> String {
    let mut buf = if options.color {
        Buffer::ansi()
    } else {
        Buffer::no_color()
    };
    if let Err(e) = write(&mut buf) {
        tracing::warn!("Failed to render output: {}", e);
    }
    String::from_utf8_lossy(buf.as_slice()).into_owned()
}

fn styled(buf: &mut Buffer, spec: &ColorSpec, text: &str) -> io::Result<()> {
    buf.set_color(spec)?;
    write!(buf, "{}", text)?;
    buf.reset()
}

fn bold() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_bold(true);
    spec
}

fn colored(color: Color) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    spec
}

pub fn format_reply(reply: &AgentReply, options: &FormatOptions) -> String {
    match reply {
        AgentReply::Conversation { text } | AgentReply::Fallback { text, .. } => {
            format!("{}\n", text)
        }
        AgentReply::Failure(report) => render(options, |buf| {
            styled(buf, &colored(Color::Red), &report.message)?;
            writeln!(buf)
        }),
        AgentReply::Tool { output, .. } => {
            let mut out = format!("{}\n", output.message);
            if let Some(ref recipe) = output.recipe {
                out.push('\n');
                out.push_str(&format_recipe(recipe, options));
            }
            out
        }
    }
}

pub fn format_ranked(summary: &Summary, results: &[RankedResult], options: &FormatOptions) -> String {
    render(options, |buf| {
        writeln!(buf, "{}", summary.text)?;
        if results.is_empty() {
            return Ok(());
        }
        writeln!(buf)?;
        for result in results {
            let dish = result.candidate.text("dish_name").unwrap_or("(untitled)");
            write!(buf, "{:>3}. ", result.rank)?;
            styled(buf, &colored(Color::Green), &format!("{:.3}", result.final_score))?;
            write!(buf, "  {}  ", dish)?;
            styled(buf, &colored(Color::Cyan), &format!("#{}", result.recipe_id()))?;
            writeln!(buf)?;
        }
        Ok(())
    })
}

pub fn format_recipe(recipe: &Recipe, options: &FormatOptions) -> String {
    render(options, |buf| {
        styled(buf, &bold(), &recipe.dish_name)?;
        write!(buf, "  ")?;
        styled(buf, &colored(Color::Cyan), &format!("#{}", recipe.id))?;
        writeln!(buf)?;

        let byline = match (&recipe.source_name, &recipe.author) {
            (Some(source), Some(author)) => Some(format!("{}, by {}", source, author)),
            (Some(source), None) => Some(source.clone()),
            (None, Some(author)) => Some(format!("by {}", author)),
            (None, None) => None,
        };
        if let Some(byline) = byline {
            writeln!(buf, "{}", byline)?;
        }

        let mut facts = Vec::new();
        if let Some(active) = recipe.active_time {
            facts.push(format!("Active {} min", active));
        }
        if let Some(total) = recipe.total_time {
            facts.push(format!("Total {} min", total));
        }
        if let Some(rating) = recipe.user_rating {
            facts.push(format!("Rated {}/5", rating));
        }
        if recipe.cooked_already {
            facts.push("Cooked".to_string());
        }
        if !facts.is_empty() {
            writeln!(buf, "{}", facts.join(" | "))?;
        }
        if !recipe.tags.is_empty() {
            writeln!(buf, "Tags: {}", recipe.tags.join(", "))?;
        }

        if !recipe.ingredients.is_empty() {
            writeln!(buf)?;
            styled(buf, &bold(), "Ingredients")?;
            writeln!(buf)?;
            for (name, detail) in &recipe.ingredients {
                let detail: Vec<&str> = detail
                    .iter()
                    .map(String::as_str)
                    .filter(|d| !d.is_empty())
                    .collect();
                if detail.is_empty() {
                    writeln!(buf, "  - {}", name)?;
                } else {
                    writeln!(buf, "  - {}: {}", name, detail.join(", "))?;
                }
            }
        }

        if !recipe.cooking_steps.is_empty() {
            writeln!(buf)?;
            styled(buf, &bold(), "Steps")?;
            writeln!(buf)?;
            for (i, step) in recipe.cooking_steps.iter().enumerate() {
                writeln!(buf, "  {}. {}", i + 1, step)?;
            }
        }

        if !recipe.recipe_notes.is_empty() {
            writeln!(buf)?;
            styled(buf, &bold(), "Notes")?;
            writeln!(buf)?;
            for note in &recipe.recipe_notes {
                writeln!(buf, "  - {}", note)?;
            }
        }

        if let Some(ref notes) = recipe.user_notes {
            writeln!(buf)?;
            writeln!(buf, "Your notes: {}", notes)?;
        }
        if let Some(ref url) = recipe.source_url {
            writeln!(buf, "Source: {}", url)?;
        }
        if let Some(ref date) = recipe.date_added {
            writeln!(buf, "Added: {}", date)?;
        }
        Ok(())
    })
}

pub fn format_tools(definitions: &[ToolDefinition], options: &FormatOptions) -> String {
    render(options, |buf| {
        for definition in definitions {
            styled(buf, &bold(), &definition.name)?;
            writeln!(buf, "  {}", definition.description)?;

            let required: Vec<&str> = definition.input_schema["required"]
                .as_array()
                .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            if let Some(properties) = definition.input_schema["properties"].as_object() {
                for (name, property) in properties {
                    let kind = property["type"].as_str().unwrap_or("any");
                    let marker = if required.contains(&name.as_str()) {
                        ""
                    } else {
                        " (optional)"
                    };
                    writeln!(buf, "    {}: {}{}", name, kind, marker)?;
                }
            }
        }
        Ok(())
    })
}
