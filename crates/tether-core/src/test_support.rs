//! In-memory collaborators for tests.
//!
//! Every implementation here is deterministic, keeps its state in memory and
//! records what was asked of it so tests can assert on the interaction as well
//! as on the result. Failure injection is opt-in per instance.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_core::test_support::{MemoryVault, StubFetcher};
//!
//! let vault = Arc::new(MemoryVault::new().with_attachment_dir("attachments"));
//! vault.insert_document("note.md", "![](https://x.com/a.png)");
//!
//! let fetcher = Arc::new(StubFetcher::new());
//! fetcher.image("https://x.com/a.png", ".png");
//! ```

use crate::download::{FetchError, FetchedImage};
use crate::error::{PersistenceError, VaultError, VaultResult};
use crate::mapping::PersistedState;
use crate::paths::{join_key, normalize_key, parent_dir, unique_path};
use crate::status::DownloadStatus;
use crate::traits::{ImageFetcher, Notice, Notifier, RefererPrompt, StateStore, Vault};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Size of images produced by [`StubFetcher::image`]
pub const STUB_IMAGE_BYTES: usize = 2048;

#[derive(Debug, Clone)]
enum Entry {
    Document(String),
    Binary(Vec<u8>),
}

/// Vault kept entirely in memory.
///
/// The attachment directory follows the usual rule: empty means the vault
/// root, a leading `.` means relative to the document.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: Mutex<BTreeMap<String, Entry>>,
    dirs: Mutex<BTreeSet<String>>,
    attachment_dir: String,
    failing_dirs: Mutex<HashSet<String>>,
    failing_removes: Mutex<HashSet<String>>,
    failing_binary_writes: Mutex<bool>,
    failing_document_writes: Mutex<bool>,
    document_writes: Mutex<Vec<String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attachment_dir(mut self, dir: impl Into<String>) -> Self {
        self.attachment_dir = dir.into();
        self
    }

    pub fn insert_document(&self, key: &str, text: &str) {
        self.files
            .lock()
            .insert(normalize_key(key), Entry::Document(text.to_string()));
    }

    pub fn insert_binary(&self, key: &str, bytes: Vec<u8>) {
        self.files
            .lock()
            .insert(normalize_key(key), Entry::Binary(bytes));
    }

    /// Current text of a document
    pub fn document(&self, key: &str) -> Option<String> {
        match self.files.lock().get(&normalize_key(key)) {
            Some(Entry::Document(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Current content of a binary file
    pub fn binary(&self, key: &str) -> Option<Vec<u8>> {
        match self.files.lock().get(&normalize_key(key)) {
            Some(Entry::Binary(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn file_exists(&self, key: &str) -> bool {
        self.files.lock().contains_key(&normalize_key(key))
    }

    pub fn has_dir(&self, key: &str) -> bool {
        self.dirs.lock().contains(&normalize_key(key))
    }

    /// Keys of every binary file, sorted
    pub fn binaries(&self) -> Vec<String> {
        self.files
            .lock()
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Binary(_)))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Make `create_dir_all` fail for `dir` and anything below it
    pub fn fail_create_dir(&self, dir: &str) {
        self.failing_dirs.lock().insert(normalize_key(dir));
    }

    /// Make `remove_file` fail for `key`
    pub fn fail_remove(&self, key: &str) {
        self.failing_removes.lock().insert(normalize_key(key));
    }

    /// Make every `write_binary` fail
    pub fn fail_binary_writes(&self, fail: bool) {
        *self.failing_binary_writes.lock() = fail;
    }

    /// Make every `write_document` fail
    pub fn fail_document_writes(&self, fail: bool) {
        *self.failing_document_writes.lock() = fail;
    }

    /// Keys passed to `write_document`, in call order
    pub fn document_writes(&self) -> Vec<String> {
        self.document_writes.lock().clone()
    }

    fn is_dir(&self, key: &str) -> bool {
        if key.is_empty() || self.dirs.lock().contains(key) {
            return true;
        }
        let prefix = format!("{}/", key);
        self.files.lock().keys().any(|k| k.starts_with(&prefix))
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn read_document(&self, key: &str) -> VaultResult<String> {
        let key = normalize_key(key);
        match self.files.lock().get(&key) {
            Some(Entry::Document(text)) => Ok(text.clone()),
            Some(Entry::Binary(_)) => Err(VaultError::io(key, "not a text document")),
            None => Err(VaultError::NotFound(key)),
        }
    }

    async fn write_document(&self, key: &str, text: &str) -> VaultResult<()> {
        let key = normalize_key(key);
        self.document_writes.lock().push(key.clone());
        if *self.failing_document_writes.lock() {
            return Err(VaultError::io(key, "read-only"));
        }
        self.files
            .lock()
            .insert(key, Entry::Document(text.to_string()));
        Ok(())
    }

    async fn exists(&self, path: &str) -> VaultResult<bool> {
        let key = normalize_key(path);
        let is_file = self.files.lock().contains_key(&key);
        Ok(is_file || self.is_dir(&key))
    }

    async fn create_dir_all(&self, path: &str) -> VaultResult<()> {
        let key = normalize_key(path);
        let blocked = self
            .failing_dirs
            .lock()
            .iter()
            .any(|dir| key == *dir || key.starts_with(&format!("{}/", dir)));
        if blocked {
            return Err(VaultError::io(key, "permission denied"));
        }

        let mut dirs = self.dirs.lock();
        let mut current = key.as_str();
        while !current.is_empty() {
            dirs.insert(current.to_string());
            current = parent_dir(current);
        }
        Ok(())
    }

    async fn write_binary(&self, path: &str, bytes: &[u8]) -> VaultResult<()> {
        let key = normalize_key(path);
        if *self.failing_binary_writes.lock() {
            return Err(VaultError::io(key, "disk full"));
        }
        self.files.lock().insert(key, Entry::Binary(bytes.to_vec()));
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> VaultResult<()> {
        let key = normalize_key(path);
        if self.failing_removes.lock().contains(&key) {
            return Err(VaultError::io(key, "file is locked"));
        }
        match self.files.lock().remove(&key) {
            Some(_) => Ok(()),
            None => Err(VaultError::NotFound(key)),
        }
    }

    async fn available_attachment_path(&self, doc_key: &str, file_name: &str) -> VaultResult<String> {
        let dir = if self.attachment_dir.starts_with('.') {
            join_key(parent_dir(&normalize_key(doc_key)), &self.attachment_dir)
        } else {
            normalize_key(&self.attachment_dir)
        };
        if !dir.is_empty() {
            self.create_dir_all(&dir).await?;
        }
        unique_path(self, &dir, file_name).await
    }
}

/// Fetcher answering from a table of canned results.
///
/// Unknown URLs fail with a transport error.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, Result<FetchedImage, FetchError>>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a valid image with `extension` for `url`
    pub fn image(&self, url: &str, extension: &str) {
        let content_type = match extension {
            ".jpg" => "image/jpeg".to_string(),
            ".svg" => "image/svg+xml".to_string(),
            other => format!("image/{}", other.trim_start_matches('.')),
        };
        self.respond(
            url,
            Ok(FetchedImage {
                bytes: vec![0x89; STUB_IMAGE_BYTES],
                extension: extension.to_string(),
                content_type,
            }),
        );
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.respond(url, Err(error));
    }

    pub fn respond(&self, url: &str, result: Result<FetchedImage, FetchError>) {
        self.responses.lock().insert(url.to_string(), result);
    }

    /// `(url, referer)` for every fetch, in call order
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedImage, FetchError> {
        self.calls
            .lock()
            .push((url.to_string(), referer.map(str::to_string)));
        self.responses
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Transport(format!("no stub for {}", url))))
    }
}

/// Prompt replaying a fixed list of answers.
///
/// Once the answers run out every further prompt is cancelled.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<String>>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// A prompt that always answers `referer`
    pub fn answering(referer: &str) -> Self {
        Self::new(std::iter::repeat(Some(referer.to_string())).take(64))
    }

    /// A prompt that cancels every time
    pub fn cancelling() -> Self {
        Self::default()
    }

    /// Documents the prompt was shown for
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl RefererPrompt for ScriptedPrompt {
    async fn request_referer(&self, doc_key: &str) -> Option<String> {
        self.asked.lock().push(doc_key.to_string());
        self.answers.lock().pop_front().flatten()
    }
}

/// Notifier keeping everything it receives
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    status_changes: Mutex<Vec<(String, String, DownloadStatus)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// `(document, url, status)` in call order
    pub fn status_changes(&self) -> Vec<(String, String, DownloadStatus)> {
        self.status_changes.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    fn status_changed(&self, doc_key: &str, url: &str, status: DownloadStatus) {
        self.status_changes
            .lock()
            .push((doc_key.to_string(), url.to_string(), status));
    }
}

/// State store holding the last saved blob in memory
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    saved: Mutex<Option<PersistedState>>,
    fail_saves: Mutex<bool>,
    save_count: Mutex<usize>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `state` was saved by an earlier session
    pub fn set_saved(&self, state: PersistedState) {
        *self.saved.lock() = Some(state);
    }

    pub fn saved(&self) -> Option<PersistedState> {
        self.saved.lock().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        *self.save_count.lock()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        Ok(self.saved.lock().clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        if *self.fail_saves.lock() {
            return Err(PersistenceError::Io("storage unavailable".to_string()));
        }
        *self.saved.lock() = Some(state.clone());
        *self.save_count.lock() += 1;
        Ok(())
    }
}
