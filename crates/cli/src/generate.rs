use anyhow::{Context, Result};
use clap::Parser;
use docgen::{
    get_config,
    template::{load_template, save_document},
    CancelSignal, ContextStrategy, FillStrategy, GenerationReport, OpenAiAssistantClient,
    PromptOutcome, ReportGenerator, SectionStatus, SourceDocument,
};
use docgen_pdf::read_pdf;
use docgen_sheets::open_catalog;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// The source PDF describing the company
    #[arg(long)]
    pdf: Option<PathBuf>,
    /// Configuration file to use instead of `config.yml`
    #[arg(long)]
    config: Option<String>,
    /// How the PDF reaches the assistant (none, inline_text, chunked_text,
    /// indexed_store, file_attachment)
    #[arg(long)]
    strategy: Option<ContextStrategy>,
    /// Where to write the generated document
    #[arg(long)]
    output: Option<PathBuf>,
    /// How placeholders are matched in the template (run, paragraph)
    #[arg(long)]
    fill_strategy: Option<FillStrategy>,
    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

pub async fn handle_generate(args: &GenerateArgs) -> Result<()> {
    let mut config = get_config(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        config.context.strategy = strategy;
    }
    if let Some(fill_strategy) = args.fill_strategy {
        config.fill.strategy = fill_strategy;
    }
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_path));

    let source = match &args.pdf {
        Some(path) => Some(read_source(path).await?),
        None => None,
    };

    let catalog = open_catalog(&config.catalog.path)?;
    let api = OpenAiAssistantClient::new(
        config.assistant.api_url.clone(),
        config.assistant.api_key.clone(),
    )?;
    let mut document = load_template(&config.template_path)?;
    let generator = ReportGenerator::new(catalog, Box::new(api), config.sections.clone())
        .with_context(config.context.clone())
        .with_fill_strategy(config.fill.strategy)
        .with_poll_policy(config.polling.clone());

    let (cancel_handle, cancel) = CancelSignal::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling the remaining prompts.");
            eprintln!("Interrupted. Finishing with the answers received so far...");
            cancel_handle.cancel();
        }
    });

    println!(
        "📄 Generating {} section(s) with context strategy '{}'...",
        generator.sections().len(),
        config.context.strategy
    );
    let report = generator
        .generate(&mut document, source.as_ref(), cancel)
        .await?;
    save_document(document, &output)?;
    info!(path = %output.display(), "Report saved.");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        println!("✅ Report written to '{}'.", output.display());
    }
    Ok(())
}

async fn read_source(path: &Path) -> Result<SourceDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("source.pdf");
    Ok(read_pdf(file_name, bytes)?)
}

fn print_report(report: &GenerationReport) {
    for section in &report.sections {
        match &section.status {
            SectionStatus::Processed => println!("{}", section.name),
            SectionStatus::Skipped { error } => {
                println!("{} (skipped: {error})", section.name);
                continue;
            }
        }
        for prompt in &section.prompts {
            let outcome = match &prompt.outcome {
                PromptOutcome::Filled { replacements } => format!("filled ({replacements}x)"),
                PromptOutcome::NotInTemplate => "not in template".to_string(),
                PromptOutcome::Superseded { by_section } => {
                    format!("superseded by '{by_section}'")
                }
                PromptOutcome::NoAnswer => "no answer".to_string(),
                PromptOutcome::Failed { error } => format!("failed: {error}"),
            };
            println!("  {}: {outcome}", prompt.placeholder);
        }
    }
    println!("{}", report.summary());
}
