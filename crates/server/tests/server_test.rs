//! # Server Endpoint Tests
//!
//! Health, form and error responses that do not need a full generation.

mod common;

use anyhow::Result;
use common::TestApp;
use reqwest::{multipart, StatusCode};
use serde_json::Value;

#[tokio::test]
async fn test_root_and_health_check_endpoints() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;

    // --- Test Root Endpoint ---
    let root_response = app.client.get(format!("{}/", app.address)).send().await?;
    assert!(root_response.status().is_success());
    let html = root_response.text().await?;
    assert!(html.contains(r#"<form action="/generate""#));
    assert!(html.contains(r#"<option value="none" selected>"#));
    assert!(html.contains("B. REFERENCE MARKET"));

    // --- Test Health Check Endpoint ---
    let health_response = app.client.get(format!("{}/health", app.address)).send().await?;
    assert!(health_response.status().is_success());
    assert_eq!("OK", health_response.text().await?);

    Ok(())
}

#[tokio::test]
async fn test_download_before_any_generation_is_not_found() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .get(format!("{}/download", app.address))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "No report has been generated yet.");
    Ok(())
}

#[tokio::test]
async fn test_unknown_strategy_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let form = multipart::Form::new().text("strategy", "telepathy");

    let response = app
        .client
        .post(format!("{}/generate", app.address))
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("unknown context strategy 'telepathy'"));
    Ok(())
}

#[tokio::test]
async fn test_strategy_needing_a_source_without_upload_is_rejected() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;
    let threads = app
        .mock_server
        .mock_async(|when, then| {
            when.path("/v1/threads");
            then.status(200).json_body(serde_json::json!({ "id": "thread_1" }));
        })
        .await;
    let form = multipart::Form::new().text("strategy", "chunked_text");

    // Act
    let response = app
        .client
        .post(format!("{}/generate", app.address))
        .multipart(form)
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(
        body["error"],
        "Context strategy 'chunked_text' requires a source document, but none was provided"
    );
    threads.assert_hits_async(0).await;
    assert!(!app.output_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_invalid_pdf_upload_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let part = multipart::Part::bytes(b"not a pdf".to_vec()).file_name("company.pdf");
    let form = multipart::Form::new().part("file", part);

    let response = app
        .client
        .post(format!("{}/generate", app.address))
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid PDF upload: Failed to parse PDF content"));
    Ok(())
}
