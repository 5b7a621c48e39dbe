//! Resolves file names to file references.
//!
//! Matching is exact, case-sensitive name equality on items of type
//! `file`. When a folder holds several files with the same name the first
//! one in provider order wins; duplicates are not disambiguated further.

use std::sync::Arc;

use super::{FileReference, FolderEntry, StorageApi, StorageError};
use crate::pipeline::retry::RetryPolicy;

/// Items requested per folder-listing page (provider maximum).
pub const FOLDER_PAGE_SIZE: u64 = 1000;

pub struct FolderLocator {
    api: Arc<dyn StorageApi>,
    retry: RetryPolicy,
}

impl FolderLocator {
    pub fn new(api: Arc<dyn StorageApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// All items in a folder, following pagination. An empty folder yields
    /// an empty list.
    pub fn list(&self, token: &str, folder_id: &str) -> Result<Vec<FolderEntry>, StorageError> {
        let mut entries = Vec::new();
        let mut offset = 0u64;

        loop {
            let page = self.retry.run(
                "list folder",
                |_| self.api.list_folder_page(token, folder_id, offset, FOLDER_PAGE_SIZE),
                StorageError::is_transient,
            )?;

            let received = page.entries.len() as u64;
            entries.extend(page.entries);
            offset += received;

            if received == 0 || offset >= page.total_count {
                break;
            }
        }

        tracing::debug!(folder_id, count = entries.len(), "Listed folder");
        Ok(entries)
    }

    /// First file in `folder_id` whose name equals `filename`.
    pub fn find_by_name(
        &self,
        token: &str,
        folder_id: &str,
        filename: &str,
    ) -> Result<FileReference, StorageError> {
        self.list(token, folder_id)?
            .into_iter()
            .find(|entry| entry.is_file() && entry.name == filename)
            .map(|entry| FileReference {
                id: entry.id,
                name: entry.name,
                parent_folder_id: folder_id.to_string(),
            })
            .ok_or_else(|| {
                StorageError::NotFound(format!("'{filename}' in folder {folder_id}"))
            })
    }

    /// Resolve by provider-side search when no folder scope is given. The
    /// first result with an exact name match wins. Results without a
    /// parent are attributed to the root folder ("0").
    pub fn search(&self, token: &str, filename: &str) -> Result<FileReference, StorageError> {
        let hits = self.retry.run(
            "search files",
            |_| self.api.search_files(token, filename),
            StorageError::is_transient,
        )?;

        hits.into_iter()
            .find(|hit| hit.kind == "file" && hit.name == filename)
            .map(|hit| FileReference {
                id: hit.id,
                name: hit.name,
                parent_folder_id: hit
                    .parent
                    .map(|p| p.id)
                    .unwrap_or_else(|| "0".to_string()),
            })
            .ok_or_else(|| StorageError::NotFound(format!("'{filename}'")))
    }
}
