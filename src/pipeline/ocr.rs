//! OCR submission and result classification.
//!
//! `OcrSpaceClient` speaks the provider's multipart API. `OcrSubmitter`
//! wraps any `OcrApi` with the retry policy and turns responses into an
//! `OcrOutcome`:
//! - transport failure / 5xx / 429 → retried, then `TransientFailure`
//! - `IsErroredOnProcessing: true` → `SemanticFailure`, never retried
//! - no parsed results → `SemanticFailure`, never retried
//! - otherwise the first parsed result's text → `Success`

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use zeroize::Zeroizing;

use super::retry::RetryPolicy;
use crate::http::describe_send_error;
use crate::storage::DocumentBlob;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR provider unreachable: {0}")]
    Transport(String),

    #[error("OCR provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed OCR response: {0}")]
    MalformedResponse(String),

    #[error("Could not build OCR upload: {0}")]
    Upload(String),
}

impl OcrError {
    pub fn is_transient(&self) -> bool {
        match self {
            OcrError::Transport(_) => true,
            OcrError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result of one `submit`, after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    Success { text: String },
    TransientFailure { cause: String },
    SemanticFailure { message: String },
}

// ═══════════════════════════════════════════════════════════
// Provider response schema
// ═══════════════════════════════════════════════════════════

/// Body of a parse request. `IsErroredOnProcessing` is required; a body
/// without it is malformed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OcrResponse {
    pub is_errored_on_processing: bool,
    #[serde(default)]
    pub error_message: Option<ErrorMessage>,
    #[serde(default)]
    pub error_details: Option<String>,
    #[serde(default)]
    pub parsed_results: Option<Vec<ParsedResult>>,
}

/// The provider sends `ErrorMessage` either as one string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    pub fn joined(&self) -> String {
        match self {
            ErrorMessage::One(message) => message.clone(),
            ErrorMessage::Many(messages) => messages.join("; "),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParsedResult {
    pub parsed_text: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl OcrResponse {
    fn diagnostic(&self) -> String {
        let message = self
            .error_message
            .as_ref()
            .map(ErrorMessage::joined)
            .filter(|m| !m.trim().is_empty());
        let details = self.error_details.as_deref().filter(|d| !d.trim().is_empty());
        match (message, details) {
            (Some(message), Some(details)) => format!("{message} ({details})"),
            (Some(message), None) => message,
            (None, Some(details)) => details.to_string(),
            (None, None) => "OCR processing failed".to_string(),
        }
    }

    /// Classify a response the provider accepted at the HTTP level.
    pub fn into_outcome(self) -> OcrOutcome {
        if self.is_errored_on_processing {
            return OcrOutcome::SemanticFailure {
                message: self.diagnostic(),
            };
        }
        match self.parsed_results.and_then(|results| results.into_iter().next()) {
            Some(first) => OcrOutcome::Success {
                text: first.parsed_text,
            },
            None => OcrOutcome::SemanticFailure {
                message: "OCR returned no parsed results".to_string(),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Provider client
// ═══════════════════════════════════════════════════════════

/// One upload to the OCR provider (no retry).
pub trait OcrApi: Send + Sync {
    fn parse_image(&self, bytes: &[u8], filename: &str) -> Result<OcrResponse, OcrError>;
}

pub struct OcrSpaceClient {
    client: Client,
    endpoint: String,
    api_key: Zeroizing<String>,
    language: String,
}

impl OcrSpaceClient {
    pub fn new(client: Client, endpoint: &str, api_key: Zeroizing<String>, language: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            language: language.to_string(),
        }
    }
}

impl OcrApi for OcrSpaceClient {
    fn parse_image(&self, bytes: &[u8], filename: &str) -> Result<OcrResponse, OcrError> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime.essence_str())
            .map_err(|e| OcrError::Upload(e.to_string()))?;

        let form = Form::new()
            .text("apikey", self.api_key.as_str().to_owned())
            .text("language", self.language.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| OcrError::Transport(describe_send_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| OcrError::Transport(describe_send_error(&e)))?;

        if !status.is_success() {
            return Err(OcrError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| OcrError::MalformedResponse(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════
// Submitter
// ═══════════════════════════════════════════════════════════

pub struct OcrSubmitter {
    api: std::sync::Arc<dyn OcrApi>,
    retry: RetryPolicy,
}

impl OcrSubmitter {
    pub fn new(api: std::sync::Arc<dyn OcrApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Submit `blob` under `filename`. Transient failures are retried per
    /// the policy; a malformed provider response is an error, not an outcome.
    pub fn submit(&self, blob: &DocumentBlob, filename: &str) -> Result<OcrOutcome, OcrError> {
        tracing::debug!(filename, size = blob.size, "Submitting document for OCR");

        let result = self.retry.run(
            "ocr upload",
            |_| self.api.parse_image(&blob.bytes, filename),
            OcrError::is_transient,
        );

        match result {
            Ok(response) => Ok(response.into_outcome()),
            Err(e) if e.is_transient() => Ok(OcrOutcome::TransientFailure {
                cause: e.to_string(),
            }),
            Err(OcrError::Status { status, body }) => Ok(OcrOutcome::SemanticFailure {
                message: if body.is_empty() {
                    format!("OCR provider returned HTTP {status}")
                } else {
                    body
                },
            }),
            Err(e) => Err(e),
        }
    }
}

/// Name the upload so the provider can infer the file type: PNG when the
/// conditioner re-encoded, otherwise sniffed from the content.
pub fn upload_name(file_id: &str, blob: &DocumentBlob) -> String {
    let extension = if blob.re_encoded {
        "png"
    } else if blob.bytes.starts_with(b"%PDF") {
        "pdf"
    } else {
        match image::guess_format(&blob.bytes) {
            Ok(image::ImageFormat::Jpeg) => "jpg",
            Ok(image::ImageFormat::Gif) => "gif",
            Ok(image::ImageFormat::Bmp) => "bmp",
            Ok(image::ImageFormat::Tiff) => "tif",
            _ => "png",
        }
    };
    format!("{file_id}.{extension}")
}
