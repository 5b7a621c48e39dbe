//! Shared types for the API layer: context, request bodies, responses.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::error::ApiError;
use crate::credentials::CredentialStatus;
use crate::pipeline::DocumentProcessor;
use crate::storage::{FileReference, FolderEntry};

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<DocumentProcessor>,
}

impl ApiContext {
    pub fn new(processor: Arc<DocumentProcessor>) -> Self {
        Self { processor }
    }
}

// ═══════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════

/// Storage ids arrive as JSON strings or numbers; both become strings.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(n) => n.to_string(),
    }))
}

/// Reject a missing or blank field with `"<field> is required."`. The
/// value is passed through as sent: file names match byte for byte.
pub fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required.")))
}

/// Like `required`, but trims surrounding whitespace. For storage ids only.
pub fn required_id(value: Option<String>, field: &str) -> Result<String, ApiError> {
    required(value, field).map(|id| id.trim().to_string())
}

#[derive(Debug, Deserialize)]
pub struct ListFolderRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FindFileRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessFileRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessByNameRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub parent_folder_id: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct FolderListing {
    pub entries: Vec<FolderEntry>,
}

#[derive(Debug, Serialize)]
pub struct FoundFile {
    pub file_id: String,
    pub filename: String,
    pub parent_folder_id: String,
}

impl From<FileReference> for FoundFile {
    fn from(file: FileReference) -> Self {
        Self {
            file_id: file.id,
            filename: file.name,
            parent_folder_id: file.parent_folder_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExtractedText {
    pub extracted_text: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub credentials: CredentialStatus,
}
