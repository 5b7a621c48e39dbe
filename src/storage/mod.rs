//! Cloud file storage: folder listing, search, and content download.
//!
//! The provider is reached through the `StorageApi` trait (bearer-token
//! authenticated, blocking). `FolderLocator` and `ContentFetcher` sit on
//! top of it and add pagination, name matching, and transient retry.
//! Authentication recovery is the caller's job (see `pipeline::processor`).

pub mod client;
pub mod fetcher;
pub mod locator;
pub mod types;

pub use client::BoxStorageClient;
pub use fetcher::ContentFetcher;
pub use locator::FolderLocator;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage provider rejected the access token")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage provider unreachable: {0}")]
    Transport(String),

    #[error("Storage provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed storage response: {0}")]
    MalformedResponse(String),
}

impl StorageError {
    /// Worth retrying the identical request: network failures, provider
    /// overload, and content that is not ready yet (202).
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Transport(_) => true,
            StorageError::Provider { status, .. } => {
                *status == 202 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

/// Blocking access to the storage provider. Every call is authenticated
/// with the given bearer token.
pub trait StorageApi: Send + Sync {
    fn list_folder_page(
        &self,
        token: &str,
        folder_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<FolderPage, StorageError>;

    fn search_files(&self, token: &str, query: &str) -> Result<Vec<SearchHit>, StorageError>;

    fn download(&self, token: &str, file_id: &str) -> Result<Vec<u8>, StorageError>;
}
