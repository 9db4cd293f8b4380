//! # Application Configuration
//!
//! Defines the configuration shared by the server and the CLI and loads it in
//! layers: built-in defaults, a YAML file with `${VAR}` substitution, plain
//! environment variables for top-level keys (`PORT`, `OUTPUT_PATH`, ...), and
//! `DOCGEN_`-prefixed variables for nested keys (e.g. `DOCGEN_CONTEXT__STRATEGY`).

use crate::{
    context::ContextSettings, errors::ConfigError, filler::FillStrategy, poll::PollPolicy,
    providers::ai::openai::DEFAULT_API_URL, types::Section,
};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::info;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The `.docx` template holding the placeholders.
    #[serde(default = "default_template_path")]
    pub template_path: String,
    /// Where the generated report is written; overwritten on every run.
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub polling: PollPolicy,
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub fill: FillConfig,
    /// The sections to generate, in order.
    #[serde(default)]
    pub sections: Vec<Section>,
}

fn default_port() -> u16 {
    9090
}

fn default_template_path() -> String {
    "templates/report_template.docx".to_string()
}

fn default_output_path() -> String {
    "output/report.docx".to_string()
}

/// Location of the prompt catalog: a workbook file or a directory of CSV sheets.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "prompt_db.xlsx".to_string(),
        }
    }
}

/// Connection settings for the assistant service.
#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FillConfig {
    #[serde(default)]
    pub strategy: FillStrategy,
}

// Reads a file and substitutes `${VAR}` references with environment values.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded.into_owned()))
}

/// Loads the application configuration.
///
/// An explicit `config_path_override` must exist. Without one, `config.yml` in
/// the working directory is used when present; otherwise only defaults and the
/// environment apply.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    // Layer 1: Programmatic defaults.
    let mut builder = ConfigBuilder::builder()
        .set_default("port", i64::from(default_port()))?
        .set_default("output_path", default_output_path())?;

    // Layer 2: The YAML file.
    let main_content = match config_path_override {
        Some(path) => Some(read_and_substitute(path)?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{path}'."))
        })?),
        None => {
            let content = read_and_substitute(DEFAULT_CONFIG_FILE)?;
            if content.is_none() {
                info!("'{DEFAULT_CONFIG_FILE}' not found. Using defaults and environment only.");
            }
            content
        }
    };
    if let Some(content) = main_content {
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Layer 3: Environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Layer 4: Prefixed environment variables for nested overrides.
        .add_source(
            Environment::with_prefix("DOCGEN")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    // The key is commonly exported under its conventional name only.
    if config.assistant.api_key.as_deref().unwrap_or_default().is_empty() {
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.assistant.api_key = Some(key);
            }
        }
    }

    Ok(config)
}
