//! # Application State
//!
//! The shared state built once at startup: the configured generator, the
//! template bytes and the output location. Catalog, template and assistant
//! configuration problems surface here, before the server accepts requests.

use docgen::{
    providers::ai::AssistantApi, template::parse_template, AppConfig, CatalogSource,
    OpenAiAssistantClient, ReportGenerator,
};
use docgen_sheets::open_catalog;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    /// A generator configured with the catalog, assistant client and sections.
    pub generator: ReportGenerator,
    /// The raw template; parsed afresh for every run.
    pub template: Arc<Vec<u8>>,
    pub output_path: PathBuf,
    /// Held for the whole of a generation, so runs never overlap.
    pub run_lock: Arc<Mutex<()>>,
    /// The path of the last document written, if any. Only locked briefly, so
    /// downloads are served while a generation runs.
    pub last_output: Arc<RwLock<Option<PathBuf>>>,
}

/// Builds the shared application state from the configuration.
///
/// Opens the prompt catalog, creates the OpenAI client and reads the template.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let catalog = open_catalog(&config.catalog.path)?;
    info!(catalog = %catalog.describe(), "Opened prompt catalog.");
    let api = OpenAiAssistantClient::new(
        config.assistant.api_url.clone(),
        config.assistant.api_key.clone(),
    )?;
    build_app_state_with(config, catalog, Box::new(api)).await
}

/// Builds the state around an already constructed catalog and assistant client.
pub async fn build_app_state_with(
    config: AppConfig,
    catalog: Arc<dyn CatalogSource>,
    api: Box<dyn AssistantApi>,
) -> anyhow::Result<AppState> {
    if config.sections.is_empty() {
        return Err(anyhow::anyhow!(
            "No sections are configured; add at least one entry under 'sections'."
        ));
    }

    let template = tokio::fs::read(&config.template_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read template '{}': {e}", config.template_path))?;
    parse_template(&template)?;
    info!(path = %config.template_path, "Loaded report template.");

    let generator = ReportGenerator::new(catalog, api, config.sections.clone())
        .with_context(config.context.clone())
        .with_fill_strategy(config.fill.strategy)
        .with_poll_policy(config.polling.clone());

    Ok(AppState {
        output_path: PathBuf::from(&config.output_path),
        config: Arc::new(config),
        generator,
        template: Arc::new(template),
        run_lock: Arc::new(Mutex::new(())),
        last_output: Arc::new(RwLock::new(None)),
    })
}
