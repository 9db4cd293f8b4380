use crate::{
    errors::AssistantError,
    providers::ai::{AssistantApi, RunHandle, ThreadMessage, ToolResources, UserMessage, VectorStore},
};
use async_trait::async_trait;
use reqwest::{multipart, Client as ReqwestClient, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;
use tracing::debug;

/// Base URL of the hosted OpenAI API.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

// --- Request and response structures ---

#[derive(Deserialize, Debug)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize, Debug)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Value>,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Serialize)]
struct VectorStoreRequest<'a> {
    name: &'a str,
    file_ids: &'a [String],
}

// --- Client implementation ---

/// A client for the OpenAI Assistants (v2) REST API.
#[derive(Clone)]
pub struct OpenAiAssistantClient {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
}

impl Debug for OpenAiAssistantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAssistantClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiAssistantClient {
    /// Creates a new client. `api_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, AssistantError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(AssistantError::MissingApiKey)?;
        let client = ReqwestClient::builder()
            .build()
            .map_err(AssistantError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.api_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AssistantError> {
        let response = request.send().await.map_err(AssistantError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(AssistantError::Deserialization)
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistantClient {
    async fn create_thread(
        &self,
        tool_resources: Option<&ToolResources>,
    ) -> Result<String, AssistantError> {
        let body = match tool_resources {
            Some(resources) if !resources.vector_store_ids.is_empty() => json!({
                "tool_resources": {
                    "file_search": { "vector_store_ids": resources.vector_store_ids }
                }
            }),
            _ => json!({}),
        };
        let thread: IdResponse = self
            .send(self.request(Method::POST, "threads").json(&body))
            .await?;
        debug!(thread_id = %thread.id, "Created thread.");
        Ok(thread.id)
    }

    async fn add_user_message(
        &self,
        thread_id: &str,
        message: &UserMessage,
    ) -> Result<(), AssistantError> {
        let attachments = message
            .attachment_file_ids
            .iter()
            .map(|file_id| json!({ "file_id": file_id, "tools": [{ "type": "file_search" }] }))
            .collect();
        let body = MessageRequest {
            role: "user",
            content: &message.content,
            attachments,
        };
        let _: IdResponse = self
            .send(
                self.request(Method::POST, &format!("threads/{thread_id}/messages"))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunHandle, AssistantError> {
        let body = RunRequest { assistant_id };
        self.send(
            self.request(Method::POST, &format!("threads/{thread_id}/runs"))
                .json(&body),
        )
        .await
    }

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunHandle, AssistantError> {
        self.send(self.request(Method::GET, &format!("threads/{thread_id}/runs/{run_id}")))
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
        let list: ListResponse<ThreadMessage> = self
            .send(
                self.request(Method::GET, &format!("threads/{thread_id}/messages"))
                    .query(&[("order", "desc"), ("limit", "100")]),
            )
            .await?;
        Ok(list.data)
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AssistantError> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);
        let file: IdResponse = self
            .send(self.request(Method::POST, "files").multipart(form))
            .await?;
        debug!(file_id = %file.id, file_name, "Uploaded file.");
        Ok(file.id)
    }

    async fn create_vector_store(
        &self,
        name: &str,
        file_ids: &[String],
    ) -> Result<VectorStore, AssistantError> {
        let body = VectorStoreRequest { name, file_ids };
        self.send(self.request(Method::POST, "vector_stores").json(&body))
            .await
    }

    async fn vector_store_status(&self, id: &str) -> Result<VectorStore, AssistantError> {
        self.send(self.request(Method::GET, &format!("vector_stores/{id}")))
            .await
    }
}
