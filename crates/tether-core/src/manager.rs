//! Image Manager
//!
//! Coordinates a request end to end: extract remote URLs from a document,
//! resolve a referer, download each URL, record the result in the
//! [`MappingStore`], rewrite the document and persist. The supporting
//! workflows (revert, delete, document lifecycle events, prune) live here too.
//!
//! Requests on different documents may run concurrently. Requests on the same
//! document must be serialized by the caller.

use crate::download::FetchError;
use crate::embed::{local_targets, remote_urls};
use crate::error::{TetherError, TetherResult, VaultError};
use crate::mapping::{asset_exists, MappingStore, PruneReport, Settings};
use crate::paths::{asset_candidates, same_asset, PathAllocator};
use crate::referer::{resolve_referer, RefererMode};
use crate::rewrite::{apply_downloads, revert};
use crate::status::{DownloadStatus, StatusBoard};
use crate::traits::{ImageFetcher, Notice, Notifier, RefererPrompt, StateStore, Vault};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phase of a download request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPhase {
    #[default]
    Idle,
    ExtractingUrls,
    ResolvingReferer,
    Prompting,
    Downloading,
    Rewriting,
    Persisting,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ExtractingUrls => "extracting-urls",
            Self::ResolvingReferer => "resolving-referer",
            Self::Prompting => "prompting",
            Self::Downloading => "downloading",
            Self::Rewriting => "rewriting",
            Self::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// A remote image of a document and its current status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    pub url: String,
    pub status: DownloadStatus,
    /// Where the image was saved, when a mapping exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

/// What happened to one URL of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved {
        url: String,
        path: String,
    },
    Failed {
        url: String,
        reason: String,
        /// The failure hints at a wrong or missing referer
        referer_suspect: bool,
    },
}

impl DownloadOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Saved { url, .. } | Self::Failed { url, .. } => url,
        }
    }

    pub fn status(&self) -> DownloadStatus {
        match self {
            Self::Saved { .. } => DownloadStatus::Success,
            Self::Failed { .. } => DownloadStatus::Failed,
        }
    }
}

/// Result of a download request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub doc: String,
    /// Referer sent with every request; empty means none
    pub referer: String,
    pub outcomes: Vec<DownloadOutcome>,
    /// Whether the document text was rewritten
    pub rewritten: bool,
}

impl DownloadSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DownloadOutcome::Saved { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// URL to local path for every saved image, in batch order
    pub fn saved(&self) -> BTreeMap<String, String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                DownloadOutcome::Saved { url, path } => Some((url.clone(), path.clone())),
                DownloadOutcome::Failed { .. } => None,
            })
            .collect()
    }
}

/// Result of deleting a document's local images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Distinct local paths rewritten back to their remote URL
    pub replaced: usize,
    pub deleted: Vec<String>,
    /// Still referenced by another tracked document
    pub kept_shared: Vec<String>,
    /// Still embedded in the document after the revert
    pub kept_referenced: Vec<String>,
    /// Could not be deleted (missing or refused)
    pub failed: Vec<String>,
}

/// Result of reverting a document to remote URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertSummary {
    pub replaced: usize,
}

/// Owns the mapping store and the status board and drives every workflow
pub struct ImageManager {
    vault: Arc<dyn Vault>,
    fetcher: Arc<dyn ImageFetcher>,
    prompt: Arc<dyn RefererPrompt>,
    notifier: Arc<dyn Notifier>,
    store: MappingStore,
    statuses: Mutex<StatusBoard>,
    phases: Mutex<HashMap<String, RequestPhase>>,
}

impl ImageManager {
    pub fn new(
        vault: Arc<dyn Vault>,
        fetcher: Arc<dyn ImageFetcher>,
        prompt: Arc<dyn RefererPrompt>,
        notifier: Arc<dyn Notifier>,
        state: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            vault,
            fetcher,
            prompt,
            notifier,
            store: MappingStore::new(state),
            statuses: Mutex::new(StatusBoard::new()),
            phases: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn vault(&self) -> &Arc<dyn Vault> {
        &self.vault
    }

    /// Current status of `url` in this session
    pub fn status(&self, url: &str) -> DownloadStatus {
        self.statuses.lock().get(url)
    }

    /// Current phase of a request on `doc_key`
    pub fn phase(&self, doc_key: &str) -> RequestPhase {
        self.phases
            .lock()
            .get(doc_key)
            .copied()
            .unwrap_or_default()
    }

    fn enter(&self, doc_key: &str, phase: RequestPhase) {
        debug!("{}: {}", doc_key, phase);
        let mut phases = self.phases.lock();
        if phase == RequestPhase::Idle {
            phases.remove(doc_key);
        } else {
            phases.insert(doc_key.to_string(), phase);
        }
    }

    fn set_status(&self, doc_key: &str, url: &str, status: DownloadStatus) {
        self.statuses.lock().set(url, status);
        self.notifier.status_changed(doc_key, url, status);
    }

    async fn read(&self, doc_key: &str) -> TetherResult<String> {
        match self.vault.read_document(doc_key).await {
            Ok(text) => Ok(text),
            Err(VaultError::NotFound(_)) => Err(TetherError::DocumentNotFound(doc_key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self) -> TetherResult<()> {
        if let Err(e) = self.store.save_if_dirty().await {
            self.notifier
                .notify(Notice::Error(format!("Failed to save image mappings: {}", e)));
            return Err(e.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Load persisted state without repairing it
    pub async fn load_state(&self) -> TetherResult<()> {
        self.store.load().await?;
        Ok(())
    }

    /// Load persisted state, drop orphans and fold in the open documents
    pub async fn startup(&self, open_docs: &[String]) -> TetherResult<PruneReport> {
        self.store.load().await?;
        let report = self.store.prune_orphans(self.vault.as_ref()).await?;
        self.persist().await?;

        for doc in open_docs {
            match self.read(doc).await {
                Ok(text) => {
                    self.on_document_opened(doc, &text).await?;
                }
                Err(TetherError::DocumentNotFound(_)) => {
                    warn!("Open document {} no longer exists, skipping", doc);
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Started with {} tracked documents ({} pruned, {} stale assets)",
            self.store.documents().len(),
            report.removed_documents.len(),
            report.removed_assets.len()
        );
        Ok(report)
    }

    /// Reconcile the document's local references and rebuild its statuses.
    ///
    /// Returns every remote URL in the text followed by mapped URLs no longer
    /// in the text, each with its status.
    pub async fn on_document_opened(&self, doc_key: &str, text: &str) -> TetherResult<Vec<ImageEntry>> {
        let outcome = self.store.reconcile(doc_key, &local_targets(text));
        {
            let mut board = self.statuses.lock();
            for (url, status) in &outcome.statuses {
                board.set(url.clone(), *status);
            }
        }
        self.persist().await?;

        let mapping = self.store.url_mapping(doc_key);
        let mut urls = remote_urls(text);
        for url in mapping.keys() {
            if !urls.contains(url) {
                urls.push(url.clone());
            }
        }

        let mut board = self.statuses.lock();
        let entries = urls
            .into_iter()
            .map(|url| {
                board.ensure(&url);
                ImageEntry {
                    status: board.get(&url),
                    local_path: mapping.get(&url).cloned(),
                    url,
                }
            })
            .collect();
        Ok(entries)
    }

    /// Images of a document with their statuses
    pub async fn list_images(&self, doc_key: &str) -> TetherResult<Vec<ImageEntry>> {
        let text = self.read(doc_key).await?;
        self.on_document_opened(doc_key, &text).await
    }

    // ------------------------------------------------------------------
    // Download
    // ------------------------------------------------------------------

    /// Download every remote image of a document
    pub async fn download_all(&self, doc_key: &str, mode: RefererMode) -> TetherResult<DownloadSummary> {
        self.enter(doc_key, RequestPhase::ExtractingUrls);
        let result = async {
            let text = self.read(doc_key).await?;
            let urls = remote_urls(&text);
            if urls.is_empty() {
                return Err(TetherError::NoImages(doc_key.to_string()));
            }
            self.run_batch(doc_key, &text, urls, mode).await
        }
        .await;
        self.enter(doc_key, RequestPhase::Idle);
        result
    }

    /// Download only `urls` for a document.
    ///
    /// URLs that the document does not embed are skipped.
    pub async fn download_selected(
        &self,
        doc_key: &str,
        urls: &[String],
        mode: RefererMode,
    ) -> TetherResult<DownloadSummary> {
        self.enter(doc_key, RequestPhase::ExtractingUrls);
        let result = async {
            let text = self.read(doc_key).await?;
            let embedded = remote_urls(&text);
            let mut batch: Vec<String> = Vec::new();
            for url in urls {
                if !embedded.contains(url) {
                    warn!("{} is not embedded in {}, skipping", url, doc_key);
                } else if !batch.contains(url) {
                    batch.push(url.clone());
                }
            }
            if batch.is_empty() {
                return Err(TetherError::NoImages(doc_key.to_string()));
            }
            self.run_batch(doc_key, &text, batch, mode).await
        }
        .await;
        self.enter(doc_key, RequestPhase::Idle);
        result
    }

    /// Re-download the document's URLs that failed in this session.
    ///
    /// Nothing failed means an empty summary and no side effects.
    pub async fn retry_failed(&self, doc_key: &str, mode: RefererMode) -> TetherResult<DownloadSummary> {
        let text = self.read(doc_key).await?;
        let urls = remote_urls(&text);
        if urls.is_empty() {
            return Err(TetherError::NoImages(doc_key.to_string()));
        }
        let failed = self.statuses.lock().failed_among(&urls);
        if failed.is_empty() {
            debug!("No failed downloads to retry for {}", doc_key);
            return Ok(DownloadSummary {
                doc: doc_key.to_string(),
                ..Default::default()
            });
        }
        self.download_selected(doc_key, &failed, mode).await
    }

    async fn resolve_mode(&self, doc_key: &str, text: &str, mode: RefererMode) -> TetherResult<String> {
        self.enter(doc_key, RequestPhase::ResolvingReferer);
        let resolved = resolve_referer(text).map(|r| r.value);
        match (mode, resolved) {
            (RefererMode::Explicit(value), _) => Ok(value),
            (_, Some(value)) => Ok(value),
            (RefererMode::Quick, None) => Ok(String::new()),
            (RefererMode::Interactive, None) => {
                self.enter(doc_key, RequestPhase::Prompting);
                self.prompt
                    .request_referer(doc_key)
                    .await
                    .ok_or(TetherError::Cancelled)
            }
        }
    }

    async fn run_batch(
        &self,
        doc_key: &str,
        text: &str,
        urls: Vec<String>,
        mode: RefererMode,
    ) -> TetherResult<DownloadSummary> {
        let referer = self.resolve_mode(doc_key, text, mode).await?;
        self.notifier.notify(Notice::Processing {
            doc: doc_key.to_string(),
        });

        self.enter(doc_key, RequestPhase::Downloading);
        let custom_dir = self.store.settings().custom_assets_dir;
        let allocator = PathAllocator::new(self.vault.as_ref(), &custom_dir);
        let referer_header = Some(referer.as_str()).filter(|r| !r.is_empty());

        let mut outcomes = Vec::with_capacity(urls.len());
        for url in &urls {
            self.set_status(doc_key, url, DownloadStatus::Pending);
            debug!("Downloading {}", url);

            let outcome = match self.fetcher.fetch(url, referer_header).await {
                Ok(image) => match self.save_image(&allocator, doc_key, &image.extension, &image.bytes).await {
                    Ok(path) => {
                        self.store.record_download(doc_key, url, &path);
                        DownloadOutcome::Saved {
                            url: url.clone(),
                            path,
                        }
                    }
                    Err(e) => DownloadOutcome::Failed {
                        url: url.clone(),
                        reason: format!("Could not save image: {}", e),
                        referer_suspect: false,
                    },
                },
                Err(e) => Self::fetch_failed(url, e),
            };

            if let DownloadOutcome::Failed {
                reason,
                referer_suspect,
                ..
            } = &outcome
            {
                warn!("Download of {} failed: {}", url, reason);
                self.notifier.notify(Notice::DownloadFailed {
                    url: url.clone(),
                    reason: reason.clone(),
                });
                if *referer_suspect {
                    self.notifier
                        .notify(Notice::RefererLikelyWrong { url: url.clone() });
                }
            }
            self.set_status(doc_key, url, outcome.status());
            outcomes.push(outcome);
        }

        let mut summary = DownloadSummary {
            doc: doc_key.to_string(),
            referer,
            outcomes,
            rewritten: false,
        };

        let saved = summary.saved();
        let rewrite = if saved.is_empty() {
            Ok(false)
        } else {
            self.enter(doc_key, RequestPhase::Rewriting);
            self.rewrite_downloaded(doc_key, &saved).await
        };

        // Downloaded files are recorded even when the rewrite failed
        self.enter(doc_key, RequestPhase::Persisting);
        let persisted = self.persist().await;
        summary.rewritten = rewrite?;
        persisted?;

        if !saved.is_empty() {
            self.notifier.notify(Notice::Downloaded {
                doc: doc_key.to_string(),
                count: saved.len(),
            });
        }
        info!(
            "{}: {} downloaded, {} failed",
            doc_key,
            summary.succeeded(),
            summary.failed()
        );
        Ok(summary)
    }

    fn fetch_failed(url: &str, error: FetchError) -> DownloadOutcome {
        DownloadOutcome::Failed {
            url: url.to_string(),
            referer_suspect: error.suggests_bad_referer(),
            reason: error.to_string(),
        }
    }

    async fn save_image(
        &self,
        allocator: &PathAllocator<'_>,
        doc_key: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, VaultError> {
        let allocation = allocator.allocate(doc_key, extension).await?;
        self.vault.write_binary(&allocation.path, bytes).await?;
        Ok(allocation.path)
    }

    /// Rewrite against the current text, which may have changed while downloading
    async fn rewrite_downloaded(&self, doc_key: &str, saved: &BTreeMap<String, String>) -> TetherResult<bool> {
        let current = match self.read(doc_key).await {
            Ok(text) => text,
            Err(TetherError::DocumentNotFound(_)) => {
                warn!("{} disappeared during download, leaving mappings in place", doc_key);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let updated = apply_downloads(&current, saved);
        if updated == current {
            return Ok(false);
        }
        self.vault.write_document(doc_key, &updated).await?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Revert and delete
    // ------------------------------------------------------------------

    fn reset_to_pending(&self, doc_key: &str, urls: impl IntoIterator<Item = String>) {
        for url in urls {
            self.set_status(doc_key, &url, DownloadStatus::Pending);
        }
    }

    /// Point the document's downloaded images back at their remote URLs.
    ///
    /// Only the text changes; files and mappings stay.
    pub async fn revert_to_remote(&self, doc_key: &str) -> TetherResult<RevertSummary> {
        let local_to_url = self.store.local_to_remote(doc_key);
        if local_to_url.is_empty() {
            return Err(TetherError::NoMapping(doc_key.to_string()));
        }
        let text = self.read(doc_key).await?;

        let (updated, replaced) = revert(&text, &local_to_url);
        self.reset_to_pending(doc_key, local_to_url.into_values());

        if replaced == 0 {
            self.notifier.notify(Notice::NothingToRevert {
                doc: doc_key.to_string(),
            });
            return Ok(RevertSummary { replaced });
        }

        self.vault.write_document(doc_key, &updated).await?;
        self.notifier.notify(Notice::Reverted {
            doc: doc_key.to_string(),
            count: replaced,
        });
        info!("{}: reverted {} images to remote URLs", doc_key, replaced);
        Ok(RevertSummary { replaced })
    }

    /// Revert the document to remote URLs, delete its unshared local images
    /// and forget its mappings.
    pub async fn delete_local_images(&self, doc_key: &str) -> TetherResult<DeleteSummary> {
        let files = self.store.file_images(doc_key);
        if files.is_empty() {
            return Err(TetherError::NoLocalImages(doc_key.to_string()));
        }
        let text = self.read(doc_key).await?;

        let local_to_url = self.store.local_to_remote(doc_key);
        let (updated, replaced) = revert(&text, &local_to_url);
        if replaced > 0 {
            self.vault.write_document(doc_key, &updated).await?;
        }
        self.reset_to_pending(doc_key, local_to_url.into_values());

        let mut summary = self.delete_unshared(doc_key, &files, &local_targets(&updated)).await;
        summary.replaced = replaced;

        self.store.remove_document(doc_key);
        self.persist().await?;

        self.notifier.notify(Notice::LocalImagesDeleted {
            doc: doc_key.to_string(),
            replaced,
            deleted: summary.deleted.len(),
        });
        Ok(summary)
    }

    /// Delete `files` unless another document tracks them or `doc_key` still
    /// embeds them as one of `still_embedded`.
    async fn delete_unshared(&self, doc_key: &str, files: &[String], still_embedded: &[String]) -> DeleteSummary {
        let mut summary = DeleteSummary::default();
        for path in files {
            if still_embedded.iter().any(|target| same_asset(doc_key, target, path)) {
                debug!("Keeping {}, the document still embeds it", path);
                summary.kept_referenced.push(path.clone());
            } else if self.store.is_shared(doc_key, path) {
                debug!("Keeping {}, still used by another document", path);
                summary.kept_shared.push(path.clone());
            } else if self.delete_asset(doc_key, path).await {
                summary.deleted.push(path.clone());
            } else {
                summary.failed.push(path.clone());
            }
        }
        summary
    }

    /// Delete the first existing location of an asset. `false` when none
    /// exists or the vault refuses.
    async fn delete_asset(&self, doc_key: &str, path: &str) -> bool {
        for candidate in asset_candidates(doc_key, path) {
            match self.vault.exists(&candidate).await {
                Ok(true) => {
                    return match self.vault.remove_file(&candidate).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Could not delete {}: {}", candidate, e);
                            false
                        }
                    };
                }
                Ok(false) => continue,
                Err(e) => {
                    warn!("Could not check {}: {}", candidate, e);
                    return false;
                }
            }
        }
        debug!("{} is already gone", path);
        false
    }

    // ------------------------------------------------------------------
    // Vault events
    // ------------------------------------------------------------------

    /// A document was removed. With auto-delete on, its unshared images are
    /// deleted first. Its mappings are dropped either way.
    pub async fn on_document_deleted(&self, doc_key: &str) -> TetherResult<DeleteSummary> {
        let mut summary = DeleteSummary::default();
        let files = self.store.file_images(doc_key);

        if self.store.settings().auto_delete_images && !files.is_empty() {
            summary = self.delete_unshared(doc_key, &files, &[]).await;
            if !summary.deleted.is_empty() {
                self.notifier.notify(Notice::AssociatedImagesDeleted {
                    doc: doc_key.to_string(),
                    deleted: summary.deleted.len(),
                });
            }
        }

        if self.store.remove_document(doc_key) {
            debug!("Dropped mappings of deleted document {}", doc_key);
        }
        self.persist().await?;
        Ok(summary)
    }

    /// A document moved; its mappings follow it
    pub async fn on_document_renamed(&self, old_key: &str, new_key: &str) -> TetherResult<()> {
        if self.store.rename_document(old_key, new_key) {
            debug!("Moved mappings from {} to {}", old_key, new_key);
        }
        self.persist().await
    }

    /// Any file was removed. Markdown files are documents, anything else is an
    /// asset that is forgotten by every document tracking it.
    pub async fn on_file_deleted(&self, path: &str) -> TetherResult<()> {
        if is_document_key(path) {
            self.on_document_deleted(path).await?;
            return Ok(());
        }

        let touched = self.store.forget_asset(path);
        if !touched.is_empty() {
            debug!("Forgot deleted asset {} in {} documents", path, touched.len());
        }
        self.persist().await
    }

    /// Drop state for vanished documents and assets
    pub async fn prune(&self) -> TetherResult<PruneReport> {
        let report = self.store.prune_orphans(self.vault.as_ref()).await?;
        self.persist().await?;
        self.notifier.notify(Notice::Pruned {
            documents: report.removed_documents.len(),
            assets: report.removed_assets.len(),
        });
        Ok(report)
    }

    /// Whether a tracked asset of `doc_key` is still on disk
    pub async fn asset_exists(&self, doc_key: &str, path: &str) -> TetherResult<bool> {
        Ok(asset_exists(self.vault.as_ref(), doc_key, path).await?)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn settings(&self) -> Settings {
        self.store.settings()
    }

    pub async fn set_custom_assets_dir(&self, dir: &str) -> TetherResult<()> {
        self.store.set_custom_assets_dir(dir.trim());
        self.persist().await
    }

    pub async fn set_auto_delete_images(&self, enabled: bool) -> TetherResult<()> {
        self.store.set_auto_delete_images(enabled);
        self.persist().await
    }
}

/// Markdown documents are the only files that carry image mappings
pub fn is_document_key(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("md"))
}
