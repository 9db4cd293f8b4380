//! # docgen: report generator CLI
//!
//! `docgen generate` fills the configured template from the prompt catalog;
//! `docgen check` validates the catalog and template without calling the
//! assistant service.

mod check;
mod generate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the report from a source PDF
    Generate(generate::GenerateArgs),
    /// Load every section's prompts and compare them with the template
    Check(check::CheckArgs),
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the command's own output.
    let subscriber = fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate(args) => generate::handle_generate(args).await,
        Commands::Check(args) => check::handle_check(args),
    }
}
