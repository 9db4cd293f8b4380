//! # Context Provider
//!
//! Decides how the uploaded source document reaches the assistant. The strategy
//! is chosen by configuration and prepared once per generation run; every prompt
//! then goes through [`PreparedContext::message`] and
//! [`PreparedContext::tool_resources`].

use crate::{
    chunking::{chunk_text, ChunkLimits},
    errors::{AssistantError, ContextError},
    poll::Poller,
    providers::ai::{AssistantApi, ToolResources, UserMessage},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
    /// Prompts are sent as they are.
    #[default]
    None,
    /// The extracted text is placed before every prompt.
    InlineText,
    /// Leading paragraph chunks of the extracted text are placed before every prompt.
    ChunkedText,
    /// The document is indexed in a remote vector store searched by every thread.
    IndexedStore,
    /// The document is uploaded once and attached to every message.
    FileAttachment,
}

impl ContextStrategy {
    pub const ALL: [ContextStrategy; 5] = [
        ContextStrategy::None,
        ContextStrategy::InlineText,
        ContextStrategy::ChunkedText,
        ContextStrategy::IndexedStore,
        ContextStrategy::FileAttachment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextStrategy::None => "none",
            ContextStrategy::InlineText => "inline_text",
            ContextStrategy::ChunkedText => "chunked_text",
            ContextStrategy::IndexedStore => "indexed_store",
            ContextStrategy::FileAttachment => "file_attachment",
        }
    }
}

impl fmt::Display for ContextStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown context strategy '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Context configuration, the `context` block of the application config.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextSettings {
    pub strategy: ContextStrategy,
    /// Target chunk size for `chunked_text`, in characters.
    pub chunk_size: usize,
    /// Overlap between pieces of an over-long paragraph, in characters.
    pub chunk_overlap: usize,
    /// Budget for text placed in front of a prompt, in characters.
    pub max_context_chars: usize,
    /// Name given to the vector store created by `indexed_store`.
    pub vector_store_name: String,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            strategy: ContextStrategy::None,
            chunk_size: 4096,
            chunk_overlap: 200,
            max_context_chars: 24_000,
            vector_store_name: "Report Source Documents".to_string(),
        }
    }
}

/// An uploaded source document together with its extracted text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub text: String,
}

/// The outcome of preparing a [`ContextStrategy`] for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedContext {
    None,
    InlineText(String),
    Chunks(Vec<String>),
    IndexedStore { vector_store_id: String },
    FileAttachment { file_id: String },
}

impl PreparedContext {
    /// Prepares the configured strategy. Remote strategies upload the document
    /// and, for `indexed_store`, wait for indexing to finish.
    #[instrument(skip_all, fields(strategy = %settings.strategy))]
    pub async fn prepare(
        settings: &ContextSettings,
        source: Option<&SourceDocument>,
        api: &dyn AssistantApi,
        poller: &Poller,
    ) -> Result<Self, ContextError> {
        let strategy = settings.strategy;
        if strategy == ContextStrategy::None {
            return Ok(PreparedContext::None);
        }
        let source =
            source.ok_or_else(|| ContextError::MissingSource(strategy.as_str().to_string()))?;

        match strategy {
            ContextStrategy::None => Ok(PreparedContext::None),
            ContextStrategy::InlineText => {
                let text = non_empty_text(source)?;
                Ok(PreparedContext::InlineText(truncate_chars(
                    text,
                    settings.max_context_chars,
                )))
            }
            ContextStrategy::ChunkedText => {
                let text = non_empty_text(source)?;
                let limits = ChunkLimits {
                    chunk_size: settings.chunk_size,
                    overlap: settings.chunk_overlap,
                };
                let chunks = leading_chunks(chunk_text(text, limits), settings.max_context_chars);
                info!("Using {} chunk(s) of '{}' as context.", chunks.len(), source.file_name);
                Ok(PreparedContext::Chunks(chunks))
            }
            ContextStrategy::IndexedStore => {
                let file_id = api
                    .upload_file(&source.file_name, source.bytes.clone())
                    .await?;
                let store = api
                    .create_vector_store(&settings.vector_store_name, &[file_id])
                    .await?;
                info!(vector_store_id = %store.id, "Waiting for the vector store to index '{}'.", source.file_name);
                let store_id = store.id.clone();
                poller
                    .wait(&store.id, || {
                        let store_id = &store_id;
                        async move {
                            Ok::<_, AssistantError>(api.vector_store_status(store_id).await?.probe())
                        }
                    })
                    .await?;
                Ok(PreparedContext::IndexedStore {
                    vector_store_id: store.id,
                })
            }
            ContextStrategy::FileAttachment => {
                let file_id = api
                    .upload_file(&source.file_name, source.bytes.clone())
                    .await?;
                Ok(PreparedContext::FileAttachment { file_id })
            }
        }
    }

    /// Builds the user message for a composed prompt.
    pub fn message(&self, prompt: &str) -> UserMessage {
        match self {
            PreparedContext::None | PreparedContext::IndexedStore { .. } => UserMessage {
                content: prompt.to_string(),
                attachment_file_ids: Vec::new(),
            },
            PreparedContext::InlineText(text) => UserMessage {
                content: format!("Context:\n{text}\n\n{prompt}"),
                attachment_file_ids: Vec::new(),
            },
            PreparedContext::Chunks(chunks) => {
                let excerpts: Vec<String> = chunks
                    .iter()
                    .enumerate()
                    .map(|(i, chunk)| format!("[Excerpt {}]\n{chunk}", i + 1))
                    .collect();
                UserMessage {
                    content: format!("Context:\n{}\n\n{prompt}", excerpts.join("\n\n")),
                    attachment_file_ids: Vec::new(),
                }
            }
            PreparedContext::FileAttachment { file_id } => UserMessage {
                content: prompt.to_string(),
                attachment_file_ids: vec![file_id.clone()],
            },
        }
    }

    /// Thread-level resources, present only for `indexed_store`.
    pub fn tool_resources(&self) -> Option<ToolResources> {
        match self {
            PreparedContext::IndexedStore { vector_store_id } => Some(ToolResources {
                vector_store_ids: vec![vector_store_id.clone()],
            }),
            _ => None,
        }
    }
}

fn non_empty_text(source: &SourceDocument) -> Result<&str, ContextError> {
    let text = source.text.trim();
    if text.is_empty() {
        return Err(ContextError::EmptySource(source.file_name.clone()));
    }
    Ok(text)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Keeps as many leading chunks as fit into `budget` characters. When even the
/// first chunk is too large, it is truncated to the budget.
fn leading_chunks(chunks: Vec<String>, budget: usize) -> Vec<String> {
    let mut used = 0;
    let mut kept = Vec::new();
    for chunk in chunks {
        let length = chunk.chars().count();
        if used + length > budget {
            if kept.is_empty() && budget > 0 {
                kept.push(truncate_chars(&chunk, budget));
            }
            break;
        }
        used += length;
        kept.push(chunk);
    }
    kept
}
