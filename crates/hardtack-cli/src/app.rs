//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "hardtack")]
#[command(
    author,
    version,
    about = "Recipe assistant for your saved recipes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Act on a piece of model output (runs the tool it calls, if any)
    Ask(TextArgs),

    /// Send a message to the assistant
    Chat(TextArgs),

    /// Find the single best matching recipe
    Find(SearchArgs),

    /// Recommend a few recipes
    Recommend(SearchArgs),

    /// Show a saved recipe
    Show(ShowArgs),

    /// Change one field of a saved recipe
    Edit(EditArgs),

    /// Add a recipe from a web page or an HTML file
    Add(AddArgs),

    /// List the tools offered to the model
    Tools,

    /// Show store status
    Status,
}

#[derive(Args)]
pub struct TextArgs {
    /// Text, joined with spaces
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// What you are in the mood for; supports tag:, ingredient:, rating:, cooked: filters
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Number of candidates to retrieve
    #[arg(short = 'n')]
    pub limit: Option<usize>,

    /// Minimum similarity threshold
    #[arg(long)]
    pub min_score: Option<f64>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Recipe id
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Recipe id
    pub id: String,

    /// Field to change
    pub field: String,

    /// New value as JSON (bare words are taken as strings)
    pub value: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// URL of the recipe page, or path of a saved HTML file with --file
    pub location: String,

    /// Treat the location as a local HTML file
    #[arg(long)]
    pub file: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
