//! Blocking HTTP client for the Box content API.

use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{FolderPage, SearchHit, StorageApi, StorageError};
use crate::http::describe_send_error;

/// Maximum search results requested per query. Only exact-name hits are
/// used, so a single page is enough.
const SEARCH_LIMIT: u32 = 100;

pub struct BoxStorageClient {
    base_url: String,
    client: Client,
}

impl BoxStorageClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Build `<base>/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StorageError::MalformedResponse(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::MalformedResponse("base URL cannot hold a path".into()))?
            .extend(segments);
        Ok(url)
    }
}

/// Box error body.
#[derive(Deserialize)]
struct BoxErrorBody {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize)]
struct SearchResults {
    #[serde(default)]
    entries: Vec<SearchHit>,
}

impl StorageApi for BoxStorageClient {
    fn list_folder_page(
        &self,
        token: &str,
        folder_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<FolderPage, StorageError> {
        let url = self.endpoint(&["folders", folder_id, "items"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "id,name,type")])
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .map_err(|e| StorageError::Transport(describe_send_error(&e)))?;

        read_json(response, &format!("folder {folder_id}"))
    }

    fn search_files(&self, token: &str, query: &str) -> Result<Vec<SearchHit>, StorageError> {
        let url = self.endpoint(&["search"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("query", query),
                ("type", "file"),
                ("content_types", "name"),
                ("fields", "id,name,type,parent"),
            ])
            .query(&[("limit", SEARCH_LIMIT)])
            .send()
            .map_err(|e| StorageError::Transport(describe_send_error(&e)))?;

        let results: SearchResults = read_json(response, &format!("search '{query}'"))?;
        Ok(results.entries)
    }

    fn download(&self, token: &str, file_id: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.endpoint(&["files", file_id, "content"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|e| StorageError::Transport(describe_send_error(&e)))?;

        let response = check_status(response, &format!("file {file_id}"))?;
        let bytes = response
            .bytes()
            .map_err(|e| StorageError::Transport(describe_send_error(&e)))?;

        tracing::debug!(file_id, size = bytes.len(), "Downloaded file content");
        Ok(bytes.to_vec())
    }
}

/// Map non-success statuses onto `StorageError`. `subject` names the
/// requested resource for not-found messages.
fn check_status(response: Response, subject: &str) -> Result<Response, StorageError> {
    let status = response.status();
    match status {
        // Box answers 202 + Retry-After while a download is being prepared
        StatusCode::ACCEPTED => Err(StorageError::Provider {
            status: status.as_u16(),
            message: format!("{subject} is not ready for download yet"),
        }),
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(StorageError::Unauthorized),
        StatusCode::NOT_FOUND => Err(StorageError::NotFound(subject.to_string())),
        _ => {
            let body = response.text().unwrap_or_else(|e| {
                tracing::debug!(status = status.as_u16(), error = %e, "Failed to read storage error body");
                String::new()
            });
            Err(StorageError::Provider {
                status: status.as_u16(),
                message: provider_message(&body),
            })
        }
    }
}

fn read_json<T: DeserializeOwned>(response: Response, subject: &str) -> Result<T, StorageError> {
    let response = check_status(response, subject)?;
    let body = response
        .text()
        .map_err(|e| StorageError::Transport(describe_send_error(&e)))?;
    serde_json::from_str(&body).map_err(|e| StorageError::MalformedResponse(e.to_string()))
}

fn provider_message(body: &str) -> String {
    match serde_json::from_str::<BoxErrorBody>(body) {
        Ok(BoxErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(BoxErrorBody { code: Some(code), .. }) => code,
        _ if body.trim().is_empty() => "no response body".to_string(),
        _ => body.trim().to_string(),
    }
}
