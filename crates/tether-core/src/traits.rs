//! Collaborator traits
//!
//! The core never touches the filesystem, the network or the user directly.
//! Everything it needs from the outside is injected through these traits so the
//! same orchestration runs inside a CLI, an editor plugin or a test harness.

use crate::download::{FetchError, FetchedImage};
use crate::error::{PersistenceError, VaultResult};
use crate::mapping::PersistedState;
use crate::status::DownloadStatus;
use async_trait::async_trait;

/// Document and asset storage rooted at the vault.
///
/// Paths are vault-relative keys with `/` separators.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Read a document's text
    async fn read_document(&self, key: &str) -> VaultResult<String>;

    /// Replace a document's text
    async fn write_document(&self, key: &str, text: &str) -> VaultResult<()>;

    /// Whether a file or directory exists
    async fn exists(&self, path: &str) -> VaultResult<bool>;

    /// Create a directory and any missing parents
    async fn create_dir_all(&self, path: &str) -> VaultResult<()>;

    /// Create or overwrite a binary file
    async fn write_binary(&self, path: &str, bytes: &[u8]) -> VaultResult<()>;

    /// Delete a file
    async fn remove_file(&self, path: &str) -> VaultResult<()>;

    /// Free path for a new attachment of `doc_key` in the host's default
    /// attachment location, creating that location if needed.
    async fn available_attachment_path(&self, doc_key: &str, file_name: &str)
        -> VaultResult<String>;
}

/// Downloads a single image
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url`, sending `referer` when it is non-empty
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedImage, FetchError>;
}

/// Obtains a referer from the user when the document does not provide one
#[async_trait]
pub trait RefererPrompt: Send + Sync {
    /// Ask for a referer for `doc_key`.
    ///
    /// `Some("")` proceeds without a header, `None` cancels the request.
    async fn request_referer(&self, doc_key: &str) -> Option<String>;
}

/// Loads and saves the persisted mapping state as a whole
#[async_trait]
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError>;

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// End-user visible outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Processing { doc: String },
    Downloaded { doc: String, count: usize },
    DownloadFailed { url: String, reason: String },
    RefererLikelyWrong { url: String },
    Reverted { doc: String, count: usize },
    NothingToRevert { doc: String },
    LocalImagesDeleted { doc: String, replaced: usize, deleted: usize },
    AssociatedImagesDeleted { doc: String, deleted: usize },
    Pruned { documents: usize, assets: usize },
    Error(String),
}

/// Receives notices and per-URL status changes
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Called every time a URL's status changes during a batch
    fn status_changed(&self, _doc_key: &str, _url: &str, _status: DownloadStatus) {}
}

/// Notifier that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notice: Notice) {}
}
