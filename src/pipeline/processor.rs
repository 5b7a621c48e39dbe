//! Document processing orchestrator.
//!
//! Single entry point for every inbound operation. Per request the flow is
//! strictly linear: locate → fetch → condition → submit. Any stage failure
//! short-circuits the rest; there is no partial result.
//!
//! Storage calls go through `with_storage_auth`: an authentication
//! rejection invalidates the shared credential and retries that one stage
//! exactly once with a fresh token.
//!
//! Uses trait-based DI for every collaborator (`TokenSource`, `StorageApi`,
//! `OcrApi`) so the orchestrator is testable with mock implementations.

use std::sync::Arc;

use super::condition::ImageConditioner;
use super::ocr::{upload_name, OcrApi, OcrOutcome, OcrSpaceClient, OcrSubmitter};
use super::retry::RetryPolicy;
use super::PipelineError;
use crate::config::{self, ServiceConfig, TokenStrategy};
use crate::credentials::{CredentialManager, OAuthRefreshSource, StaticTokenSource, TokenSource};
use crate::http::blocking_client;
use crate::storage::{
    BoxStorageClient, ContentFetcher, FileReference, FolderEntry, FolderLocator, StorageApi,
    StorageError,
};

pub struct DocumentProcessor {
    credentials: Arc<CredentialManager>,
    locator: FolderLocator,
    fetcher: ContentFetcher,
    conditioner: ImageConditioner,
    submitter: OcrSubmitter,
}

impl DocumentProcessor {
    pub fn new(
        credentials: Arc<CredentialManager>,
        storage: Arc<dyn StorageApi>,
        ocr: Arc<dyn OcrApi>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            credentials,
            locator: FolderLocator::new(storage.clone(), retry),
            fetcher: ContentFetcher::new(storage, retry),
            conditioner: ImageConditioner::default(),
            submitter: OcrSubmitter::new(ocr, retry),
        }
    }

    /// Wire the real collaborators from configuration. Builds blocking HTTP
    /// clients, so call it outside the async runtime.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let source: Box<dyn TokenSource> = match &config.token_strategy {
            TokenStrategy::OAuthRefresh {
                client_id,
                client_secret,
                refresh_token,
                token_url,
            } => Box::new(OAuthRefreshSource::new(
                blocking_client(config::TOKEN_TIMEOUT)?,
                token_url,
                client_id,
                client_secret.clone(),
                refresh_token.clone(),
            )),
            TokenStrategy::Static { access_token } => {
                Box::new(StaticTokenSource::new(access_token.clone()))
            }
        };

        let storage = BoxStorageClient::new(
            blocking_client(config::STORAGE_TIMEOUT)?,
            &config.storage_api_url,
        );
        let ocr = OcrSpaceClient::new(
            blocking_client(config::OCR_TIMEOUT)?,
            &config.ocr_api_url,
            config.ocr_api_key.clone(),
            &config.ocr_language,
        );

        tracing::info!(
            strategy = config.token_strategy.name(),
            storage = %config.storage_api_url,
            ocr = %config.ocr_api_url,
            "Document processor configured"
        );

        Ok(Self::new(
            Arc::new(CredentialManager::new(source)),
            Arc::new(storage),
            Arc::new(ocr),
            RetryPolicy::default(),
        ))
    }

    pub fn with_conditioner(mut self, conditioner: ImageConditioner) -> Self {
        self.conditioner = conditioner;
        self
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn list_folder(&self, folder_id: &str) -> Result<Vec<FolderEntry>, PipelineError> {
        self.with_storage_auth("list folder", |token| self.locator.list(token, folder_id))
    }

    /// Resolve a file by name, inside `folder_id` when given, otherwise by
    /// provider-side search.
    pub fn find_file(
        &self,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<FileReference, PipelineError> {
        match folder_id {
            Some(folder_id) => self.with_storage_auth("locate file", |token| {
                self.locator.find_by_name(token, folder_id, filename)
            }),
            None => self.with_storage_auth("search file", |token| {
                self.locator.search(token, filename)
            }),
        }
    }

    pub fn process_file(&self, file_id: &str) -> Result<String, PipelineError> {
        let blob = self.with_storage_auth("fetch content", |token| {
            self.fetcher.fetch(token, file_id)
        })?;

        let blob = self.conditioner.condition(blob)?;
        let filename = upload_name(file_id, &blob);

        match self.submitter.submit(&blob, &filename)? {
            OcrOutcome::Success { text } => {
                tracing::info!(file_id, chars = text.len(), "Text extracted");
                Ok(text)
            }
            OcrOutcome::TransientFailure { cause } => {
                tracing::warn!(file_id, cause, "OCR provider unreachable after retries");
                Err(PipelineError::Transport(cause))
            }
            OcrOutcome::SemanticFailure { message } => {
                tracing::warn!(file_id, message, "OCR reported a processing failure");
                Err(PipelineError::Semantic(message))
            }
        }
    }

    pub fn process_by_name(
        &self,
        filename: &str,
        parent_folder_id: &str,
    ) -> Result<String, PipelineError> {
        let file = self.find_file(filename, Some(parent_folder_id))?;
        self.process_file(&file.id)
    }

    /// Run one storage stage with the current token. On an authentication
    /// rejection, invalidate that token and run the stage once more.
    fn with_storage_auth<T, F>(&self, stage: &str, call: F) -> Result<T, PipelineError>
    where
        F: Fn(&str) -> Result<T, StorageError>,
    {
        let credential = self.credentials.get_token()?;
        match call(credential.access_token()) {
            Err(StorageError::Unauthorized) => {
                tracing::warn!(stage, "Storage rejected access token, refreshing and retrying once");
                self.credentials.invalidate_rejected(&credential)?;
                let fresh = self.credentials.get_token()?;
                call(fresh.access_token()).map_err(PipelineError::from)
            }
            other => other.map_err(PipelineError::from),
        }
    }
}
