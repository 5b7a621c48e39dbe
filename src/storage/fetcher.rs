use std::sync::Arc;

use super::{DocumentBlob, StorageApi, StorageError};
use crate::pipeline::retry::RetryPolicy;

/// Downloads file content, retrying transport-level failures.
pub struct ContentFetcher {
    api: Arc<dyn StorageApi>,
    retry: RetryPolicy,
}

impl ContentFetcher {
    pub fn new(api: Arc<dyn StorageApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    pub fn fetch(&self, token: &str, file_id: &str) -> Result<DocumentBlob, StorageError> {
        let bytes = self.retry.run(
            "download file",
            |_| self.api.download(token, file_id),
            StorageError::is_transient,
        )?;
        Ok(DocumentBlob::new(bytes))
    }
}
