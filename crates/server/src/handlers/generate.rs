//! # Generation Handlers
//!
//! `POST /generate` runs one generation from an uploaded PDF; `GET /download`
//! serves the document it produced.

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::GenerateResponse;
use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::Response,
    Json,
};
use axum_extra::extract::Multipart;
use docgen::{
    template::{parse_template, save_document, DOCX_MIME_TYPE},
    CancelSignal, ContextStrategy, SourceDocument,
};
use docgen_pdf::read_pdf;
use serde_json::json;
use tracing::info;

/// The form fields of a generation request.
#[derive(Default)]
struct GenerateForm {
    file: Option<(String, Vec<u8>)>,
    strategy: Option<ContextStrategy>,
}

async fn read_form(mut multipart: Multipart) -> Result<GenerateForm, AppError> {
    let mut form = GenerateForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("source.pdf").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    info!("Received source document: {file_name}");
                    form.file = Some((file_name, bytes.to_vec()));
                }
            }
            "strategy" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field: {e}")))?;
                if !value.trim().is_empty() {
                    form.strategy = Some(value.parse().map_err(AppError::BadRequest)?);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Runs one generation and saves the document to the configured output path.
///
/// Generations are serialised: a second request waits until the running one
/// has written its output. Downloads do not wait for a running generation.
pub async fn generate_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<GenerateResponse>>, AppError> {
    let form = read_form(multipart).await?;
    let source: Option<SourceDocument> = form
        .file
        .map(|(file_name, bytes)| read_pdf(&file_name, bytes))
        .transpose()?;

    let mut context = app_state.config.context.clone();
    if let Some(strategy) = form.strategy {
        context.strategy = strategy;
    }
    let generator = app_state.generator.clone().with_context(context.clone());

    let _running = app_state.run_lock.lock().await;
    info!(strategy = %context.strategy, "Starting generation.");

    let mut document = parse_template(&app_state.template)?;
    let report = generator
        .generate(&mut document, source.as_ref(), CancelSignal::never())
        .await?;
    save_document(document, &app_state.output_path)?;
    *app_state.last_output.write().await = Some(app_state.output_path.clone());

    let debug_info = json!({
        "context_strategy": context.strategy,
        "source": source.as_ref().map(|s| json!({
            "file_name": s.file_name,
            "size": s.bytes.len(),
            "text_chars": s.text.chars().count(),
        })),
        "output_path": app_state.output_path.display().to_string(),
    });
    let response = GenerateResponse {
        summary: report.summary(),
        download_url: "/download".to_string(),
        report,
    };
    Ok(wrap_response(response, debug_params, Some(debug_info)))
}

/// Streams the last generated document as a Word attachment.
pub async fn download_handler(State(app_state): State<AppState>) -> Result<Response, AppError> {
    let path = app_state
        .last_output
        .read()
        .await
        .clone()
        .ok_or_else(|| AppError::NotFound("No report has been generated yet.".to_string()))?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "Failed to read generated report '{}': {e}",
            path.display()
        ))
    })?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.docx");

    Response::builder()
        .header(header::CONTENT_TYPE, DOCX_MIME_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.into()))
}
