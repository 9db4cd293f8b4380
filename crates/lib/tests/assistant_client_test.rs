//! # Assistant Client Tests
//!
//! Verifies the request shapes sent by `OpenAiAssistantClient` and the way the
//! orchestrator and context provider drive it, against a `wiremock` server.

use docgen::{
    context::{ContextSettings, ContextStrategy, PreparedContext, SourceDocument},
    errors::AssistantError,
    orchestrator::AnswerOrchestrator,
    poll::{CancelSignal, PollPolicy, Poller},
    providers::ai::{openai::OpenAiAssistantClient, AssistantApi, ToolResources, UserMessage},
    remove_citations,
};
use docgen_test_utils::setup_tracing;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_poller() -> Poller {
    Poller::new(
        PollPolicy {
            max_attempts: 10,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
            timeout_secs: Some(10),
        },
        CancelSignal::never(),
    )
}

fn client(server: &MockServer) -> OpenAiAssistantClient {
    OpenAiAssistantClient::new(server.uri(), Some("test-key".to_string())).unwrap()
}

async fn mount_thread(server: &MockServer, thread_id: &str) {
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": thread_id })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ask_round_trip() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    mount_thread(&server, "thread_abc").await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_abc/messages"))
        .and(body_json(json!({
            "role": "user",
            "content": "Describe X Respond in 3 sentences."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_abc/runs"))
        .and(body_json(json!({ "assistant_id": "asst_bo" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "run_1", "status": "queued" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/threads/thread_abc/runs/run_1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "run_1", "status": "in_progress" })),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/threads/thread_abc/runs/run_1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "run_1", "status": "completed" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/threads/thread_abc/messages"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [{
                        "type": "text",
                        "text": { "value": "Revenue grew 10%【3:1†source】 last year【3:2†source】.", "annotations": [] }
                    }]
                },
                {
                    "id": "msg_1",
                    "role": "user",
                    "content": [{ "type": "text", "text": { "value": "Describe X Respond in 3 sentences.", "annotations": [] } }]
                }
            ]
        })))
        .mount(&server)
        .await;

    let orchestrator = AnswerOrchestrator::new(Box::new(client(&server)), fast_poller());

    // --- 2. Act ---
    let answer = orchestrator
        .ask(
            "Describe X Respond in 3 sentences.",
            "asst_bo",
            &PreparedContext::None,
        )
        .await
        .unwrap();

    // --- 3. Assert ---
    let answer = answer.expect("an assistant answer");
    assert_eq!(remove_citations(&answer), "Revenue grew 10% last year.");
}

#[tokio::test]
async fn test_thread_without_assistant_text_has_no_answer() {
    setup_tracing();
    let server = MockServer::start().await;
    mount_thread(&server, "thread_q").await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_q/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_q/runs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "run_q", "status": "completed" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_q/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "msg_2",
                "role": "assistant",
                "content": [{ "type": "image_file", "image_file": { "file_id": "file_img" } }]
            }]
        })))
        .mount(&server)
        .await;

    let orchestrator = AnswerOrchestrator::new(Box::new(client(&server)), fast_poller());
    let answer = orchestrator
        .ask("Draw a chart.", "asst_1", &PreparedContext::None)
        .await
        .unwrap();

    assert_eq!(answer, None);
}

#[tokio::test]
async fn test_failed_run_is_an_error() {
    setup_tracing();
    let server = MockServer::start().await;
    mount_thread(&server, "thread_f").await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_f/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_f/runs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "run_f", "status": "queued" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_f/runs/run_f"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_f",
            "status": "failed",
            "last_error": { "code": "rate_limit_exceeded", "message": "Rate limit reached." }
        })))
        .mount(&server)
        .await;

    let orchestrator = AnswerOrchestrator::new(Box::new(client(&server)), fast_poller());
    let err = orchestrator
        .ask("Describe Y.", "asst_1", &PreparedContext::None)
        .await
        .unwrap_err();

    match err {
        AssistantError::RunFailed { id, status, detail } => {
            assert_eq!(id, "run_f");
            assert_eq!(status, "failed");
            assert_eq!(detail.as_deref(), Some("Rate limit reached."));
        }
        other => panic!("Expected RunFailed, but got {other:?}"),
    }
}

#[tokio::test]
async fn test_api_error_status_is_reported() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key provided"))
        .mount(&server)
        .await;

    let err = client(&server).create_thread(None).await.unwrap_err();
    match err {
        AssistantError::Api { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("Incorrect API key"));
        }
        other => panic!("Expected Api error, but got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_api_key_is_rejected() {
    let err = OpenAiAssistantClient::new("http://localhost".to_string(), Some("  ".to_string()))
        .unwrap_err();
    assert!(matches!(err, AssistantError::MissingApiKey));
    assert!(OpenAiAssistantClient::new("http://localhost".to_string(), None).is_err());
}

#[tokio::test]
async fn test_indexed_store_context_is_prepared_and_used() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "file_pdf" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vector_stores"))
        .and(body_json(json!({ "name": "Quarterly", "file_ids": ["file_pdf"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "vs_1", "status": "in_progress" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vector_stores/vs_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "vs_1",
            "status": "completed",
            "file_counts": { "in_progress": 0, "completed": 1, "failed": 0, "cancelled": 0, "total": 1 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(body_partial_json(json!({
            "tool_resources": { "file_search": { "vector_store_ids": ["vs_1"] } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "thread_vs" })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let settings = ContextSettings {
        strategy: ContextStrategy::IndexedStore,
        vector_store_name: "Quarterly".to_string(),
        ..Default::default()
    };
    let source = SourceDocument {
        file_name: "quarterly.pdf".to_string(),
        bytes: b"%PDF-1.7 test".to_vec(),
        text: String::new(),
    };

    // --- 2. Act ---
    let context = PreparedContext::prepare(&settings, Some(&source), &api, &fast_poller())
        .await
        .unwrap();
    let thread_id = api
        .create_thread(context.tool_resources().as_ref())
        .await
        .unwrap();

    // --- 3. Assert ---
    assert_eq!(
        context,
        PreparedContext::IndexedStore {
            vector_store_id: "vs_1".to_string()
        }
    );
    assert_eq!(
        context.tool_resources(),
        Some(ToolResources {
            vector_store_ids: vec!["vs_1".to_string()]
        })
    );
    assert_eq!(thread_id, "thread_vs");
}

#[tokio::test]
async fn test_file_attachment_is_sent_with_message() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_att/messages"))
        .and(body_partial_json(json!({
            "role": "user",
            "content": "Summarise.",
            "attachments": [{ "file_id": "file_9", "tools": [{ "type": "file_search" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let message = UserMessage {
        content: "Summarise.".to_string(),
        attachment_file_ids: vec!["file_9".to_string()],
    };
    client(&server)
        .add_user_message("thread_att", &message)
        .await
        .unwrap();
}
