use anyhow::{bail, Result};
use clap::Parser;
use docgen::{filler::placeholder_occurs, get_config, template::load_template};
use docgen_sheets::open_catalog;

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Configuration file to use instead of `config.yml`
    #[arg(long)]
    config: Option<String>,
}

/// Loads every section's catalog and reports entry counts. Placeholders that
/// do not appear in the template are listed. Nothing is sent to the assistant.
pub fn handle_check(args: &CheckArgs) -> Result<()> {
    let config = get_config(args.config.as_deref())?;
    let catalog = open_catalog(&config.catalog.path)?;
    let template = load_template(&config.template_path)?;
    println!("Catalog: {}", catalog.describe());

    let mut failed = 0;
    for section in &config.sections {
        match catalog.load(section.sheets()) {
            Ok(prompts) => {
                println!(
                    "✅ {}: {} prompt(s), formatting {:?}",
                    section.name,
                    prompts.entries.len(),
                    prompts.formatting_suffix
                );
                for entry in &prompts.entries {
                    if !placeholder_occurs(&template, &entry.placeholder) {
                        println!("   ⚠️  {} does not occur in the template", entry.placeholder);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                println!("❌ {}: {e}", section.name);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} section(s) could not be loaded");
    }
    Ok(())
}
