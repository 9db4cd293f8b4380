use thiserror::Error;

/// Errors raised while talking to the remote assistant service.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Request to assistant API failed: {0}")]
    Request(reqwest::Error),
    #[error("Failed to deserialize assistant API response: {0}")]
    Deserialization(reqwest::Error),
    #[error("Assistant API returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("API key is missing")]
    MissingApiKey,
    #[error("Remote job '{id}' ended with status '{status}'{}", fmt_detail(.detail))]
    RunFailed {
        id: String,
        status: String,
        detail: Option<String>,
    },
    #[error("Remote job '{id}' did not complete after {attempts} status checks")]
    AttemptsExhausted { id: String, attempts: u32 },
    #[error("Remote job '{id}' did not complete within {elapsed_ms} ms")]
    TimedOut { id: String, elapsed_ms: u128 },
    #[error("Waiting for remote job '{id}' was cancelled")]
    Cancelled { id: String },
}

fn fmt_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Errors raised while reading a prompt catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to open prompt catalog '{source_name}': {message}")]
    Open {
        source_name: String,
        message: String,
    },
    #[error("Sheet '{0}' was not found in the prompt catalog")]
    SheetNotFound(String),
    #[error("Column '{column}' was not found in sheet '{sheet}'")]
    ColumnNotFound { sheet: String, column: String },
    #[error("Sheet '{0}' has no formatting instruction beneath its header row")]
    MissingFormatting(String),
    #[error("Failed to read sheet '{sheet}': {message}")]
    Read { sheet: String, message: String },
}

/// Errors raised while reading or writing the template document.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template document: {0}")]
    Read(String),
    #[error("Failed to write document: {0}")]
    Write(String),
    #[error("I/O error on document file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while preparing the context that accompanies every prompt.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Context strategy '{0}' requires a source document, but none was provided")]
    MissingSource(String),
    #[error("The source document '{0}' contains no extractable text")]
    EmptySource(String),
    #[error("Remote indexing of the source document failed: {0}")]
    Remote(#[from] AssistantError),
}

/// Errors that abort a whole generation run before any section is processed.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Errors raised while loading the application configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}
