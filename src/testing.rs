//! Shared test doubles: in-memory storage, scripted OCR, a counting token
//! source and a manual clock.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zeroize::Zeroizing;

use crate::credentials::{Clock, CredentialError, CredentialManager, TokenGrant, TokenSource};
use crate::pipeline::ocr::OcrResponse;
use crate::pipeline::{DocumentProcessor, OcrApi, OcrError, RetryPolicy};
use crate::storage::{FolderEntry, FolderPage, SearchHit, StorageApi, StorageError};

// ═══════════════════════════════════════════════════════════
// Credentials
// ═══════════════════════════════════════════════════════════

/// Issues `token-1`, `token-2`, ... with a fixed lifetime.
pub struct MockTokenSource {
    lifetime_secs: i64,
    fail: bool,
    delay: StdDuration,
    calls: AtomicU32,
}

impl MockTokenSource {
    pub fn new(lifetime_secs: i64) -> Self {
        Self {
            lifetime_secs,
            fail: false,
            delay: StdDuration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = StdDuration::from_millis(ms);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenSource for MockTokenSource {
    fn strategy(&self) -> &'static str {
        "mock"
    }

    fn fetch_token(&self) -> Result<TokenGrant, CredentialError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail {
            return Err(CredentialError::Rejected {
                status: 400,
                message: "invalid_grant".into(),
            });
        }
        Ok(TokenGrant {
            access_token: Zeroizing::new(format!("token-{n}")),
            expires_in: Some(Duration::seconds(self.lifetime_secs)),
        })
    }
}

impl TokenSource for Arc<MockTokenSource> {
    fn strategy(&self) -> &'static str {
        self.as_ref().strategy()
    }

    fn fetch_token(&self) -> Result<TokenGrant, CredentialError> {
        self.as_ref().fetch_token()
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

impl Clock for Arc<ManualClock> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}

// ═══════════════════════════════════════════════════════════
// Storage
// ═══════════════════════════════════════════════════════════

pub fn entry(id: &str, name: &str, kind: &str) -> FolderEntry {
    FolderEntry {
        id: id.into(),
        name: name.into(),
        kind: kind.into(),
    }
}

/// In-memory storage provider. Unknown folders and files are `NotFound`.
#[derive(Default)]
pub struct MockStorage {
    folders: HashMap<String, Vec<FolderEntry>>,
    files: HashMap<String, Vec<u8>>,
    search_hits: Vec<SearchHit>,
    rejected_tokens: HashSet<String>,
    transient_failures: AtomicU32,
    list_calls: AtomicU32,
    download_calls: AtomicU32,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(mut self, id: &str, entries: Vec<FolderEntry>) -> Self {
        self.folders.insert(id.into(), entries);
        self
    }

    pub fn with_file(mut self, id: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(id.into(), bytes);
        self
    }

    pub fn with_search_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.search_hits = hits;
        self
    }

    /// The first `n` calls of any kind fail with a transport error.
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn rejecting_tokens(mut self, tokens: &[&str]) -> Self {
        self.rejected_tokens = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> u32 {
        self.download_calls.load(Ordering::SeqCst)
    }

    fn gate(&self, token: &str) -> Result<(), StorageError> {
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Transport("connection reset".into()));
        }
        if self.rejected_tokens.contains(token) {
            return Err(StorageError::Unauthorized);
        }
        Ok(())
    }
}

impl StorageApi for MockStorage {
    fn list_folder_page(
        &self,
        token: &str,
        folder_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<FolderPage, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.gate(token)?;
        let all = self
            .folders
            .get(folder_id)
            .ok_or_else(|| StorageError::NotFound(format!("folder {folder_id}")))?;
        let entries = all
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(FolderPage {
            total_count: all.len() as u64,
            entries,
        })
    }

    fn search_files(&self, token: &str, _query: &str) -> Result<Vec<SearchHit>, StorageError> {
        self.gate(token)?;
        Ok(self.search_hits.clone())
    }

    fn download(&self, token: &str, file_id: &str) -> Result<Vec<u8>, StorageError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.gate(token)?;
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("file {file_id}")))
    }
}

// ═══════════════════════════════════════════════════════════
// OCR
// ═══════════════════════════════════════════════════════════

type Script = Box<dyn Fn(u32) -> Result<OcrResponse, OcrError> + Send + Sync>;

/// OCR provider driven by a script keyed on the 1-based call number.
pub struct MockOcr {
    script: Script,
    calls: AtomicU32,
    last_upload: Mutex<Option<(Vec<u8>, String)>>,
}

impl MockOcr {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(u32) -> Result<OcrResponse, OcrError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicU32::new(0),
            last_upload: Mutex::new(None),
        }
    }

    pub fn always(response: Result<OcrResponse, OcrError>) -> Self {
        Self::new(move |_| response.clone())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_upload(&self) -> Option<(Vec<u8>, String)> {
        self.last_upload.lock().unwrap().clone()
    }
}

impl OcrApi for MockOcr {
    fn parse_image(&self, bytes: &[u8], filename: &str) -> Result<OcrResponse, OcrError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_upload.lock().unwrap() = Some((bytes.to_vec(), filename.to_string()));
        (self.script)(n)
    }
}

pub fn ocr_json(value: serde_json::Value) -> Result<OcrResponse, OcrError> {
    serde_json::from_value(value).map_err(|e| OcrError::MalformedResponse(e.to_string()))
}

// ═══════════════════════════════════════════════════════════
// Image fixtures
// ═══════════════════════════════════════════════════════════

fn png_bytes(img: RgbImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// Seeded RGB noise. Incompressible, so the PNG is roughly 3 bytes per pixel.
pub fn noise_png(width: u32, height: u32) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    png_bytes(RgbImage::from_fn(width, height, |_, _| {
        Rgb([rng.gen(), rng.gen(), rng.gen()])
    }))
}

pub fn solid_png(width: u32, height: u32) -> Vec<u8> {
    png_bytes(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
}

// ═══════════════════════════════════════════════════════════
// Wiring
// ═══════════════════════════════════════════════════════════

/// A processor over mock collaborators with zero retry delay.
pub fn mock_processor(storage: MockStorage, ocr: MockOcr) -> DocumentProcessor {
    DocumentProcessor::new(
        Arc::new(CredentialManager::new(Box::new(MockTokenSource::new(3600)))),
        Arc::new(storage),
        Arc::new(ocr),
        RetryPolicy::new(3, StdDuration::ZERO),
    )
}

pub fn text_ocr(text: &str) -> MockOcr {
    MockOcr::always(ocr_json(serde_json::json!({
        "IsErroredOnProcessing": false,
        "ParsedResults": [{"ParsedText": text}]
    })))
}

// ═══════════════════════════════════════════════════════════
// Local HTTP stubs
// ═══════════════════════════════════════════════════════════

/// Serve `router` on an ephemeral 127.0.0.1 port from a background thread
/// with its own runtime, so blocking clients can call it from a plain
/// `#[test]`. The server lives until the test process exits.
pub fn serve_stub(router: axum::Router) -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });

    addr
}

/// An address nothing listens on.
pub fn closed_addr() -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Blocking client with a short timeout for stub round trips.
pub fn stub_client() -> reqwest::blocking::Client {
    crate::http::blocking_client(StdDuration::from_secs(5)).unwrap()
}
