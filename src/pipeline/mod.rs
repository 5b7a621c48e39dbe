//! Document pipeline: locate → fetch → condition → submit.

pub mod condition;
pub mod ocr;
pub mod processor;
pub mod retry;

pub use condition::{ConditionError, ImageConditioner, MAX_UPLOAD_BYTES};
pub use ocr::{OcrApi, OcrError, OcrOutcome, OcrSpaceClient, OcrSubmitter};
pub use processor::DocumentProcessor;
pub use retry::RetryPolicy;

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::storage::StorageError;

/// Request-level failure kinds. Every stage error maps onto one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Storage credential rejected or could not be refreshed.
    #[error("Storage authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator stayed unreachable after retries.
    #[error("Upstream transport failure: {0}")]
    Transport(String),

    /// A collaborator accepted the request but reported a content-level
    /// problem. Never retried.
    #[error("Processing failed: {0}")]
    Semantic(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CredentialError> for PipelineError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Rejected { .. } | CredentialError::NotRenewable => {
                PipelineError::Auth(err.to_string())
            }
            CredentialError::Transport(_) => PipelineError::Transport(err.to_string()),
            CredentialError::MalformedResponse(_) | CredentialError::LockPoisoned => {
                PipelineError::Internal(err.to_string())
            }
        }
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unauthorized => PipelineError::Auth(err.to_string()),
            StorageError::NotFound(what) => PipelineError::NotFound(what),
            StorageError::Transport(_) => PipelineError::Transport(err.to_string()),
            StorageError::Provider { .. } if err.is_transient() => {
                PipelineError::Transport(err.to_string())
            }
            StorageError::Provider { .. } => PipelineError::Semantic(err.to_string()),
            StorageError::MalformedResponse(_) => PipelineError::Internal(err.to_string()),
        }
    }
}

impl From<ConditionError> for PipelineError {
    fn from(err: ConditionError) -> Self {
        match err {
            ConditionError::Decode(_) => PipelineError::Semantic(err.to_string()),
            ConditionError::Encode(_) => PipelineError::Internal(err.to_string()),
        }
    }
}

impl From<OcrError> for PipelineError {
    fn from(err: OcrError) -> Self {
        if err.is_transient() {
            PipelineError::Transport(err.to_string())
        } else {
            PipelineError::Internal(err.to_string())
        }
    }
}
