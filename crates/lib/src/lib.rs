//! # Docgen
//!
//! Generates Word reports from a prompt catalog. Each catalog section names a
//! prompt sheet, a formatting sheet and a remote assistant; every prompt is
//! answered by the assistant (optionally with context from a source PDF), the
//! answer is cleaned of citation markers, and the result replaces the matching
//! placeholder in a `.docx` template.
//!
//! The crate holds the core pipeline. Tabular catalog formats, PDF extraction,
//! the web form and the command line live in their own crates.

pub mod catalog;
pub mod chunking;
pub mod cleaner;
pub mod config;
pub mod context;
pub mod errors;
pub mod filler;
pub mod generator;
pub mod orchestrator;
pub mod poll;
pub mod providers;
pub mod report;
pub mod template;
pub mod types;

pub use catalog::CatalogSource;
pub use cleaner::remove_citations;
pub use config::{get_config, AppConfig};
pub use context::{ContextSettings, ContextStrategy, PreparedContext, SourceDocument};
pub use errors::{
    AssistantError, CatalogError, ConfigError, ContextError, GenerateError, TemplateError,
};
pub use filler::{fill_placeholder, FillStrategy};
pub use generator::ReportGenerator;
pub use orchestrator::AnswerOrchestrator;
pub use poll::{CancelHandle, CancelSignal, PollPolicy, Poller};
pub use providers::ai::{openai::OpenAiAssistantClient, AssistantApi};
pub use report::{GenerationReport, PromptOutcome, SectionStatus};
pub use types::{PromptCatalog, PromptEntry, Section, SheetPair};
