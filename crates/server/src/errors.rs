use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docgen::{ContextError, GenerateError, TemplateError};
use docgen_pdf::PdfError;
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// Each variant maps onto an HTTP status in [`IntoResponse`].
pub enum AppError {
    /// A generation run could not start.
    Generate(GenerateError),
    /// The uploaded form was incomplete or unreadable.
    BadRequest(String),
    NotFound(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        AppError::Generate(err)
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        AppError::Generate(GenerateError::Template(err))
    }
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        AppError::BadRequest(format!("Invalid PDF upload: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Generate(err) => {
                error!("GenerateError: {:?}", err);
                match err {
                    GenerateError::Context(
                        e @ (ContextError::MissingSource(_) | ContextError::EmptySource(_)),
                    ) => (StatusCode::BAD_REQUEST, e.to_string()),
                    GenerateError::Context(e @ ContextError::Remote(_)) => {
                        (StatusCode::BAD_GATEWAY, e.to_string())
                    }
                    GenerateError::Template(e) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Template error: {e}"),
                    ),
                }
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
