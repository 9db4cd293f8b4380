use anyhow::Result;
use async_trait::async_trait;
use docgen::catalog::{catalog_from_rows, CatalogSource};
use docgen::errors::{AssistantError, CatalogError};
use docgen::types::{PromptCatalog, SheetPair};
use docgen::providers::ai::{
    AssistantApi, ContentBlock, FileCounts, RunHandle, RunStatus, TextContent, ThreadMessage,
    ToolResources, UserMessage, VectorStore,
};
use docx_rs::{Docx, Paragraph, Run};
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// --- Mock Assistant ---

/// How the mock reacts to a message containing a given key.
#[derive(Clone, Debug)]
enum Scripted {
    Answer(String),
    EmptyReply,
    RunEnds(RunStatus),
    ApiError(String),
}

/// A user message as the mock received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedMessage {
    pub thread_id: String,
    pub content: String,
    pub attachment_file_ids: Vec<String>,
}

#[derive(Default, Debug)]
struct Thread {
    content: String,
    script: Option<Scripted>,
    status_checks: u32,
}

#[derive(Default, Debug)]
struct MockState {
    next_id: u32,
    threads: HashMap<String, Thread>,
    thread_resources: Vec<Option<ToolResources>>,
    messages: Vec<RecordedMessage>,
    runs: Vec<(String, String)>,
    uploads: Vec<(String, usize)>,
    vector_stores: Vec<(String, Vec<String>)>,
}

impl MockState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

/// A scripted, call-recording stand-in for the assistant service.
///
/// Replies are chosen by the first programmed key that occurs in the thread's
/// user message. With `pending_checks` set, runs start `queued` and reach their
/// final status on the `pending_checks`-th status check.
#[derive(Clone, Debug)]
pub struct MockAssistant {
    scripts: Arc<Mutex<Vec<(String, Scripted)>>>,
    state: Arc<Mutex<MockState>>,
    pending_checks: u32,
}

impl MockAssistant {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(MockState::default())),
            pending_checks: 0,
        }
    }

    /// Status check on which runs finish; zero finishes them at start.
    pub fn with_pending_checks(mut self, pending_checks: u32) -> Self {
        self.pending_checks = pending_checks;
        self
    }

    fn script(&self, key: &str, script: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .push((key.to_string(), script));
    }

    /// Pre-programs an answer for messages containing `key`.
    pub fn add_answer(&self, key: &str, answer: &str) {
        self.script(key, Scripted::Answer(answer.to_string()));
    }

    /// Messages containing `key` complete without any assistant text.
    pub fn add_empty_reply(&self, key: &str) {
        self.script(key, Scripted::EmptyReply);
    }

    /// Runs for messages containing `key` end with `status`.
    pub fn add_run_failure(&self, key: &str, status: RunStatus) {
        self.script(key, Scripted::RunEnds(status));
    }

    /// Starting a run for messages containing `key` fails with an API error.
    pub fn add_api_error(&self, key: &str, message: &str) {
        self.script(key, Scripted::ApiError(message.to_string()));
    }

    pub fn get_messages(&self) -> Vec<RecordedMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    /// `(thread id, assistant id)` of every run started.
    pub fn get_runs(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().runs.clone()
    }

    /// Tool resources passed to every created thread, in creation order.
    pub fn get_thread_resources(&self) -> Vec<Option<ToolResources>> {
        self.state.lock().unwrap().thread_resources.clone()
    }

    /// `(file name, size)` of every upload.
    pub fn get_uploads(&self) -> Vec<(String, usize)> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// `(name, file ids)` of every vector store created.
    pub fn get_vector_stores(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().vector_stores.clone()
    }

    fn final_status(script: Option<&Scripted>) -> RunStatus {
        match script {
            Some(Scripted::RunEnds(status)) => *status,
            _ => RunStatus::Completed,
        }
    }
}

impl Default for MockAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistantApi for MockAssistant {
    async fn create_thread(
        &self,
        tool_resources: Option<&ToolResources>,
    ) -> Result<String, AssistantError> {
        let mut state = self.state.lock().unwrap();
        let id = state.id("thread");
        state.threads.insert(id.clone(), Thread::default());
        state.thread_resources.push(tool_resources.cloned());
        Ok(id)
    }

    async fn add_user_message(
        &self,
        thread_id: &str,
        message: &UserMessage,
    ) -> Result<(), AssistantError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| message.content.contains(key.as_str()))
            .map(|(_, script)| script.clone());

        let mut state = self.state.lock().unwrap();
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| AssistantError::Api {
                status: 404,
                message: format!("No thread found with id '{thread_id}'."),
            })?;
        thread.content = message.content.clone();
        thread.script = script;
        state.messages.push(RecordedMessage {
            thread_id: thread_id.to_string(),
            content: message.content.clone(),
            attachment_file_ids: message.attachment_file_ids.clone(),
        });
        Ok(())
    }

    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunHandle, AssistantError> {
        let mut state = self.state.lock().unwrap();
        let script = state.threads.get(thread_id).and_then(|t| t.script.clone());
        let content = state
            .threads
            .get(thread_id)
            .map(|t| t.content.clone())
            .unwrap_or_default();
        match &script {
            None => {
                return Err(AssistantError::Api {
                    status: 500,
                    message: format!("MockAssistant: no answer programmed. Got: '{content}'"),
                })
            }
            Some(Scripted::ApiError(message)) => {
                return Err(AssistantError::Api {
                    status: 500,
                    message: message.clone(),
                })
            }
            Some(_) => {}
        }

        state
            .runs
            .push((thread_id.to_string(), assistant_id.to_string()));
        let id = state.id("run");
        let status = if self.pending_checks > 0 {
            RunStatus::Queued
        } else {
            Self::final_status(script.as_ref())
        };
        Ok(RunHandle {
            id,
            status,
            last_error: None,
        })
    }

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunHandle, AssistantError> {
        let mut state = self.state.lock().unwrap();
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| AssistantError::Api {
                status: 404,
                message: format!("No thread found with id '{thread_id}'."),
            })?;
        thread.status_checks += 1;
        let status = if thread.status_checks < self.pending_checks {
            RunStatus::InProgress
        } else {
            Self::final_status(thread.script.as_ref())
        };
        Ok(RunHandle {
            id: run_id.to_string(),
            status,
            last_error: None,
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
        let state = self.state.lock().unwrap();
        let Some(thread) = state.threads.get(thread_id) else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::new();
        if let Some(Scripted::Answer(answer)) = &thread.script {
            messages.push(ThreadMessage {
                role: "assistant".to_string(),
                content: vec![ContentBlock::Text {
                    text: TextContent {
                        value: answer.clone(),
                    },
                }],
            });
        }
        messages.push(ThreadMessage {
            role: "user".to_string(),
            content: vec![ContentBlock::Text {
                text: TextContent {
                    value: thread.content.clone(),
                },
            }],
        });
        Ok(messages)
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AssistantError> {
        let mut state = self.state.lock().unwrap();
        state.uploads.push((file_name.to_string(), bytes.len()));
        Ok(state.id("file"))
    }

    async fn create_vector_store(
        &self,
        name: &str,
        file_ids: &[String],
    ) -> Result<VectorStore, AssistantError> {
        let mut state = self.state.lock().unwrap();
        state
            .vector_stores
            .push((name.to_string(), file_ids.to_vec()));
        Ok(VectorStore {
            id: state.id("vs"),
            status: "in_progress".to_string(),
            file_counts: FileCounts {
                in_progress: file_ids.len() as u32,
                total: file_ids.len() as u32,
                ..Default::default()
            },
        })
    }

    async fn vector_store_status(&self, id: &str) -> Result<VectorStore, AssistantError> {
        let state = self.state.lock().unwrap();
        let total = state
            .vector_stores
            .last()
            .map_or(0, |(_, files)| files.len() as u32);
        Ok(VectorStore {
            id: id.to_string(),
            status: "completed".to_string(),
            file_counts: FileCounts {
                completed: total,
                total,
                ..Default::default()
            },
        })
    }
}

// --- Static Catalog ---

/// A catalog source serving sheets held in memory.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    sheets: HashMap<String, Vec<Vec<String>>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet given as rows of cells, header first.
    pub fn with_sheet(mut self, name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self.sheets.insert(name.to_string(), rows);
        self
    }

    fn sheet(&self, name: &str) -> Result<&[Vec<String>], CatalogError> {
        self.sheets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CatalogError::SheetNotFound(name.to_string()))
    }
}

impl CatalogSource for StaticCatalog {
    fn load(&self, sheets: SheetPair<'_>) -> Result<PromptCatalog, CatalogError> {
        let prompt_rows = self.sheet(sheets.prompt_sheet)?;
        let format_rows = self.sheet(sheets.format_sheet)?;
        catalog_from_rows(sheets, prompt_rows, format_rows)
    }

    fn describe(&self) -> String {
        format!("in-memory catalog ({} sheets)", self.sheets.len())
    }
}

// --- Fixture Builders ---

/// Builds `.docx` bytes with one paragraph per entry, each paragraph made of
/// the given runs.
pub fn build_template_runs(paragraphs: &[&[&str]]) -> Result<Vec<u8>> {
    let mut doc = Docx::new();
    for runs in paragraphs {
        let mut paragraph = Paragraph::new();
        for text in *runs {
            paragraph = paragraph.add_run(Run::new().add_text(*text));
        }
        doc = doc.add_paragraph(paragraph);
    }
    let mut buffer = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to pack template: {e}"))?;
    Ok(buffer.into_inner())
}

/// Builds `.docx` bytes with one single-run paragraph per line.
pub fn build_template(lines: &[&str]) -> Result<Vec<u8>> {
    let paragraphs: Vec<&[&str]> = lines.iter().map(std::slice::from_ref).collect();
    build_template_runs(&paragraphs)
}

/// Writes `<dir>/<sheet>.csv` with the given rows, header first.
pub fn write_csv_catalog(dir: &Path, sheet: &str, rows: &[&[&str]]) -> Result<PathBuf> {
    let path = dir.join(format!("{sheet}.csv"));
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&path)?;
    for row in rows {
        writer.write_record(*row)?;
    }
    writer.flush()?;
    Ok(path)
}

// --- Test-Specific Helpers ---
#[cfg(feature = "pdf")]
pub mod helpers {
    use anyhow::Result;
    use printpdf::{
        BuiltinFont, Layer, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Pt, TextItem,
        TextMatrix, TextRenderingMode,
    };

    /// Line pitch of the generated page; an empty entry leaves a blank line.
    const LINE_PITCH_MM: f32 = 5.0;

    /// Generates a single-page PDF with one line of 12pt Helvetica per entry.
    ///
    /// Empty entries draw nothing but still advance the cursor, which is how a
    /// paragraph gap looks inside a real PDF.
    pub fn generate_test_pdf(lines: &[&str]) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new("Source Document");
        let mut page = PdfPage::new(Mm(210.0), Mm(297.0), vec![]);
        let layer_id = doc.add_layer(&Layer::new("Body"));
        let font = BuiltinFont::Helvetica;

        let mut ops = vec![
            Op::BeginLayer {
                layer_id: layer_id.clone(),
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(12.0),
                font,
            },
        ];
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            ops.extend([
                Op::StartTextSection,
                Op::SetTextMatrix {
                    matrix: TextMatrix::Translate(
                        Mm(10.0).into(),
                        Mm(280.0 - LINE_PITCH_MM * i as f32).into(),
                    ),
                },
                Op::SetTextRenderingMode {
                    mode: TextRenderingMode::Fill,
                },
                Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(line.to_string())],
                    font,
                },
                Op::EndTextSection,
            ]);
        }
        ops.push(Op::EndLayer { layer_id });

        page.ops = ops;
        doc.pages.push(page);

        let mut warnings = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            eprintln!("PDF generation warnings: {warnings:?}");
        }

        Ok(bytes)
    }
}
