use docgen::GenerationReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
pub struct DebugParams {
    pub debug: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    pub result: T,
}

/// The result of one `POST /generate` call.
#[derive(Serialize, Deserialize)]
pub struct GenerateResponse {
    pub summary: String,
    /// Where the generated document can be fetched.
    pub download_url: String,
    pub report: GenerationReport,
}
