use serde::{Deserialize, Serialize};

/// One item in a folder listing. `kind` is the provider's item type
/// (`file`, `folder`, `web_link`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FolderEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderPage {
    pub total_count: u64,
    #[serde(default)]
    pub entries: Vec<FolderEntry>,
}

/// Parent folder reference attached to search results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParentRef {
    pub id: String,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parent: Option<ParentRef>,
}

/// A resolved file, scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    pub id: String,
    pub name: String,
    pub parent_folder_id: String,
}

/// Raw document bytes. Replaced, never mutated, by the conditioner.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentBlob {
    pub bytes: Vec<u8>,
    pub size: usize,
    /// True when the conditioner re-encoded the content as PNG.
    pub re_encoded: bool,
}

impl DocumentBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        let size = bytes.len();
        Self {
            bytes,
            size,
            re_encoded: false,
        }
    }

    pub fn re_encoded(bytes: Vec<u8>) -> Self {
        Self {
            re_encoded: true,
            ..Self::new(bytes)
        }
    }
}

impl std::fmt::Debug for DocumentBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentBlob")
            .field("size", &self.size)
            .field("re_encoded", &self.re_encoded)
            .finish()
    }
}
