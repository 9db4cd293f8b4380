pub mod openai;

use crate::{errors::AssistantError, poll::Probe};
use async_trait::async_trait;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A trait for interacting with a remote, thread-based assistant service.
///
/// The operations mirror the lifecycle of one question: create a thread, post a
/// user message, start a run against an assistant, check the run until it is
/// finished, and read the thread's messages back. File upload and vector stores
/// back the context strategies that hand the source PDF to the service.
#[async_trait]
pub trait AssistantApi: Send + Sync + Debug + DynClone {
    /// Creates a new, empty conversation thread and returns its id.
    async fn create_thread(
        &self,
        tool_resources: Option<&ToolResources>,
    ) -> Result<String, AssistantError>;

    /// Appends a user message to a thread.
    async fn add_user_message(
        &self,
        thread_id: &str,
        message: &UserMessage,
    ) -> Result<(), AssistantError>;

    /// Starts a run of `assistant_id` over the thread.
    async fn start_run(&self, thread_id: &str, assistant_id: &str)
        -> Result<RunHandle, AssistantError>;

    /// Fetches the current state of a run.
    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunHandle, AssistantError>;

    /// Lists the thread's messages, most recent first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError>;

    /// Uploads a file for use by assistants and returns its id.
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AssistantError>;

    /// Creates a vector store indexing the given files.
    async fn create_vector_store(
        &self,
        name: &str,
        file_ids: &[String],
    ) -> Result<VectorStore, AssistantError>;

    /// Fetches the indexing state of a vector store.
    async fn vector_store_status(&self, id: &str) -> Result<VectorStore, AssistantError>;
}

dyn_clone::clone_trait_object!(AssistantApi);

// --- Wire types shared by all implementations ---

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RunHandle {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl RunHandle {
    /// Interprets the run's status for the poller.
    ///
    /// Tool calls are never answered, so `requires_action` ends the wait.
    pub fn probe(&self) -> Probe {
        match self.status {
            RunStatus::Completed => Probe::Done,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling | RunStatus::Unknown => {
                Probe::Pending
            }
            RunStatus::RequiresAction
            | RunStatus::Cancelled
            | RunStatus::Failed
            | RunStatus::Incomplete
            | RunStatus::Expired => Probe::Failed {
                status: self.status.as_str().to_string(),
                detail: self
                    .last_error
                    .as_ref()
                    .and_then(|e| e.message.clone().or_else(|| e.code.clone())),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TextContent {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl ThreadMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }
}

/// A user message, optionally carrying file attachments searchable by the assistant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserMessage {
    pub content: String,
    pub attachment_file_ids: Vec<String>,
}

/// Resources made available to every run of a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResources {
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileCounts {
    #[serde(default)]
    pub in_progress: u32,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub cancelled: u32,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct VectorStore {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub file_counts: FileCounts,
}

impl VectorStore {
    /// Interprets the store's indexing state for the poller.
    pub fn probe(&self) -> Probe {
        let counts = &self.file_counts;
        match self.status.as_str() {
            "expired" => Probe::Failed {
                status: self.status.clone(),
                detail: None,
            },
            "completed" if counts.failed > 0 && counts.completed == 0 => Probe::Failed {
                status: "indexing_failed".to_string(),
                detail: Some(format!("{} of {} files failed", counts.failed, counts.total)),
            },
            "completed" => Probe::Done,
            _ => Probe::Pending,
        }
    }
}
