//! # Common Test Utilities
//!
//! `TestApp` spawns the real server on a random port. Its configuration points
//! the assistant client at an `httpmock::MockServer`, the catalog at a CSV
//! directory and the template and output at a temporary directory.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use docgen::get_config;
use docgen_server::{
    router,
    state::{build_app_state, AppState},
};
use docgen_test_utils::{build_template, write_csv_catalog};
use httpmock::MockServer;
use reqwest::Client;
use std::{fs, net::SocketAddr, path::PathBuf};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const TEMPLATE_LINES: &[&str] = &[
    "Company overview: {{BO_OVERVIEW}}",
    "Ownership: {{BO_OWNERS}}",
    "Market: {{RM_MARKET}}",
];

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    pub output_path: PathBuf,
    _work_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the server with two sections, three prompts and no context.
    pub async fn spawn() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start_async().await;
        let work_dir = tempdir()?;
        let root = work_dir.path();

        let catalog_dir = root.join("catalog");
        fs::create_dir_all(&catalog_dir)?;
        write_csv_catalog(
            &catalog_dir,
            "BO_Prompts",
            &[
                &["Placeholder", "Prompt"],
                &["{{BO_OVERVIEW}}", "Describe the group."],
                &["{{BO_OWNERS}}", "Who owns the group?"],
            ],
        )?;
        write_csv_catalog(
            &catalog_dir,
            "BO_Format_add",
            &[&["Formatting"], &[" Respond in 3 sentences."]],
        )?;
        write_csv_catalog(
            &catalog_dir,
            "RM_Prompts",
            &[
                &["Placeholder", "Prompt"],
                &["{{RM_MARKET}}", "Describe the market."],
            ],
        )?;
        write_csv_catalog(&catalog_dir, "RM_Format_add", &[&["Formatting"], &[" Be brief."]])?;

        let template_path = root.join("template.docx");
        fs::write(&template_path, build_template(TEMPLATE_LINES)?)?;
        let output_path = root.join("output").join("report.docx");

        let config_path = root.join("config.yml");
        let config_content = format!(
            r#"
port: 0
template_path: "{template}"
output_path: "{output}"
catalog:
  path: "{catalog}"
assistant:
  api_url: "{api_url}"
  api_key: "test-key"
polling:
  max_attempts: 5
  initial_delay_ms: 10
  max_delay_ms: 20
  timeout_secs: 5
context:
  strategy: none
sections:
  - name: "A. BUSINESS OPPORTUNITY AND GROUP OVERVIEW"
    prompt_sheet: BO_Prompts
    format_sheet: BO_Format_add
    assistant_id: asst_bo
  - name: "B. REFERENCE MARKET"
    prompt_sheet: RM_Prompts
    format_sheet: RM_Format_add
    assistant_id: asst_rm
"#,
            template = template_path.display(),
            output = output_path.display(),
            catalog = catalog_dir.display(),
            api_url = mock_server.url("/v1"),
        );
        fs::write(&config_path, config_content)?;

        let config = get_config(config_path.to_str())?;
        let app_state = build_app_state(config).await?;
        Self::spawn_with_state(app_state, mock_server, work_dir, output_path).await
    }

    async fn spawn_with_state(
        app_state: AppState,
        mock_server: MockServer,
        work_dir: TempDir,
        output_path: PathBuf,
    ) -> Result<Self> {
        let app_state_for_harness = app_state.clone();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state: app_state_for_harness,
            output_path,
            _work_dir: work_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Mocks a thread that answers every prompt with `answer` straight away.
    ///
    /// Only user messages whose JSON body contains `message_contains` are
    /// accepted; the returned mock counts them.
    pub async fn mock_assistant_answer(
        &self,
        answer: &str,
        message_contains: &str,
    ) -> httpmock::Mock<'_> {
        self.mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/v1/threads");
                then.status(200).json_body(serde_json::json!({ "id": "thread_1" }));
            })
            .await;
        let messages = self
            .mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/v1/threads/thread_1/messages")
                    .header("authorization", "Bearer test-key")
                    .body_contains(message_contains);
                then.status(200).json_body(serde_json::json!({ "id": "msg_1" }));
            })
            .await;
        self.mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/v1/threads/thread_1/runs");
                then.status(200)
                    .json_body(serde_json::json!({ "id": "run_1", "status": "completed" }));
            })
            .await;
        self.mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .path("/v1/threads/thread_1/messages");
                then.status(200).json_body(serde_json::json!({
                    "data": [
                        {
                            "role": "assistant",
                            "content": [{ "type": "text", "text": { "value": answer, "annotations": [] } }]
                        },
                        {
                            "role": "user",
                            "content": [{ "type": "text", "text": { "value": "question", "annotations": [] } }]
                        }
                    ]
                }));
            })
            .await;
        messages
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
