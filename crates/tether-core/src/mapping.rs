//! Mapping Store
//!
//! The single owner of durable state: which local assets belong to which
//! document, which remote URL each asset was downloaded from, and the user's
//! settings. The state is loaded and saved as one blob through a
//! [`StateStore`]; in between it lives in memory behind a mutex so a request's
//! sequence of updates is never observed half-applied.
//!
//! Mutations are synchronous and only mark the store dirty. Callers flush with
//! [`MappingStore::save`] once per request. A failed save leaves the in-memory
//! state untouched and still dirty, so the next save picks it up.

use crate::error::{PersistenceError, VaultResult};
use crate::paths::{asset_candidates, same_asset};
use crate::status::DownloadStatus;
use crate::traits::{StateStore, Vault};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Remote URL to local path, per document
pub type UrlMap = BTreeMap<String, String>;

/// Everything persisted, in its on-disk shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub custom_assets_dir: String,
    pub auto_delete_images: bool,
    pub url_mapping: BTreeMap<String, UrlMap>,
    #[serde(deserialize_with = "deserialize_file_image_map")]
    pub file_image_map: BTreeMap<String, Vec<String>>,
}

/// Older state files stored `fileImageMap` as a JSON string. Entries that are
/// not arrays of strings are skipped rather than failing the whole load.
fn deserialize_file_image_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let raw = Value::deserialize(deserializer)?;
    let value = match raw {
        Value::String(encoded) => serde_json::from_str(&encoded).unwrap_or(Value::Null),
        other => other,
    };

    let mut map = BTreeMap::new();
    if let Value::Object(entries) = value {
        for (doc, paths) in entries {
            if let Value::Array(items) = paths {
                let mut set: Vec<String> = Vec::new();
                for path in items.iter().filter_map(Value::as_str) {
                    if !set.iter().any(|p| p == path) {
                        set.push(path.to_string());
                    }
                }
                map.insert(doc, set);
            }
        }
    }
    Ok(map)
}

/// User settings persisted alongside the mappings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Empty means the vault's default attachment location
    pub custom_assets_dir: String,
    pub auto_delete_images: bool,
}

/// Result of folding a document's live text into the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Local references that were not tracked before
    pub adopted: Vec<String>,
    /// Status of every remote URL mapped for the document
    pub statuses: Vec<(String, DownloadStatus)>,
}

/// What a prune pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed_documents: Vec<String>,
    /// `(document, path)` pairs whose asset no longer exists
    pub removed_assets: Vec<(String, String)>,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.removed_documents.is_empty() && self.removed_assets.is_empty()
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: PersistedState,
    revision: u64,
    saved_revision: u64,
}

impl Inner {
    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Durable document/asset bookkeeping
pub struct MappingStore {
    backend: Arc<dyn StateStore>,
    inner: Mutex<Inner>,
}

impl MappingStore {
    pub fn new(backend: Arc<dyn StateStore>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Replace in-memory state with what the backend holds.
    ///
    /// Nothing saved yet is not an error; the store starts empty.
    pub async fn load(&self) -> Result<(), PersistenceError> {
        let loaded = self.backend.load().await?.unwrap_or_default();
        debug!(
            "Loaded mapping state: {} documents with files, {} with URL mappings",
            loaded.file_image_map.len(),
            loaded.url_mapping.len()
        );

        let mut inner = self.inner.lock();
        inner.state = loaded;
        inner.touch();
        inner.saved_revision = inner.revision;
        Ok(())
    }

    /// Persist the current state.
    ///
    /// On failure the in-memory state is kept and the store stays dirty.
    pub async fn save(&self) -> Result<(), PersistenceError> {
        let (snapshot, revision) = {
            let inner = self.inner.lock();
            (inner.state.clone(), inner.revision)
        };

        match self.backend.save(&snapshot).await {
            Ok(()) => {
                let mut inner = self.inner.lock();
                inner.saved_revision = inner.saved_revision.max(revision);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to persist mapping state: {}", e);
                Err(e)
            }
        }
    }

    /// Save only when something changed since the last successful save
    pub async fn save_if_dirty(&self) -> Result<bool, PersistenceError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.save().await.map(|()| true)
    }

    pub fn is_dirty(&self) -> bool {
        let inner = self.inner.lock();
        inner.revision != inner.saved_revision
    }

    pub fn snapshot(&self) -> PersistedState {
        self.inner.lock().state.clone()
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn settings(&self) -> Settings {
        let inner = self.inner.lock();
        Settings {
            custom_assets_dir: inner.state.custom_assets_dir.clone(),
            auto_delete_images: inner.state.auto_delete_images,
        }
    }

    pub fn set_custom_assets_dir(&self, dir: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.state.custom_assets_dir = dir.into();
        inner.touch();
    }

    pub fn set_auto_delete_images(&self, enabled: bool) {
        let mut inner = self.inner.lock();
        inner.state.auto_delete_images = enabled;
        inner.touch();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Every document key with any recorded state
    pub fn documents(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let keys: BTreeSet<&String> = inner
            .state
            .file_image_map
            .keys()
            .chain(inner.state.url_mapping.keys())
            .collect();
        keys.into_iter().cloned().collect()
    }

    pub fn file_images(&self, doc_key: &str) -> Vec<String> {
        self.inner
            .lock()
            .state
            .file_image_map
            .get(doc_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn url_mapping(&self, doc_key: &str) -> UrlMap {
        self.inner
            .lock()
            .state
            .url_mapping
            .get(doc_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Local path to remote URL for a document (inverse of [`Self::url_mapping`])
    pub fn local_to_remote(&self, doc_key: &str) -> BTreeMap<String, String> {
        self.url_mapping(doc_key)
            .into_iter()
            .map(|(url, local)| (local, url))
            .collect()
    }

    /// Whether any other tracked document also references `path`
    pub fn is_shared(&self, doc_key: &str, path: &str) -> bool {
        let inner = self.inner.lock();
        let ours = asset_candidates(doc_key, path);
        inner
            .state
            .file_image_map
            .iter()
            .filter(|(other, _)| other.as_str() != doc_key)
            .any(|(other, paths)| {
                paths.iter().any(|p| {
                    asset_candidates(other, p)
                        .iter()
                        .any(|candidate| ours.contains(candidate))
                })
            })
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Record that `url` was saved to `local_path` for `doc_key`
    pub fn record_download(&self, doc_key: &str, url: &str, local_path: &str) {
        let mut inner = self.inner.lock();
        let files = inner
            .state
            .file_image_map
            .entry(doc_key.to_string())
            .or_default();
        if !files.iter().any(|p| p == local_path) {
            files.push(local_path.to_string());
        }
        inner
            .state
            .url_mapping
            .entry(doc_key.to_string())
            .or_default()
            .insert(url.to_string(), local_path.to_string());
        inner.touch();
    }

    /// Drop both mapping entries of a document. Returns whether anything was removed.
    pub fn remove_document(&self, doc_key: &str) -> bool {
        let mut inner = self.inner.lock();
        let had_files = inner.state.file_image_map.remove(doc_key).is_some();
        let had_urls = inner.state.url_mapping.remove(doc_key).is_some();
        if had_files || had_urls {
            inner.touch();
        }
        had_files || had_urls
    }

    /// Move a document's entries to a new key, merging with any existing ones
    pub fn rename_document(&self, old_key: &str, new_key: &str) -> bool {
        if old_key == new_key {
            return false;
        }

        let mut inner = self.inner.lock();
        let files = inner.state.file_image_map.remove(old_key);
        let urls = inner.state.url_mapping.remove(old_key);
        if files.is_none() && urls.is_none() {
            return false;
        }

        if let Some(files) = files {
            let target = inner
                .state
                .file_image_map
                .entry(new_key.to_string())
                .or_default();
            for path in files {
                if !target.contains(&path) {
                    target.push(path);
                }
            }
        }
        if let Some(urls) = urls {
            inner
                .state
                .url_mapping
                .entry(new_key.to_string())
                .or_default()
                .extend(urls);
        }
        inner.touch();
        true
    }

    /// Remove an asset from every file set that references it.
    ///
    /// Returns the documents that were touched.
    pub fn forget_asset(&self, path: &str) -> Vec<String> {
        let mut inner = self.inner.lock();
        let mut touched = Vec::new();
        for (doc, files) in inner.state.file_image_map.iter_mut() {
            let before = files.len();
            files.retain(|p| !same_asset(doc, p, path));
            if files.len() != before {
                touched.push(doc.clone());
            }
        }
        if !touched.is_empty() {
            inner.touch();
        }
        touched
    }

    /// Fold the local references currently in a document's text into its file
    /// set and report the status each mapped remote URL should have.
    ///
    /// A URL is `Success` when its mapped path is tracked and still referenced
    /// by the text; otherwise it is `Pending` (drift, not a failure).
    pub fn reconcile(&self, doc_key: &str, live_local_refs: &[String]) -> ReconcileOutcome {
        let mut inner = self.inner.lock();
        let mut adopted = Vec::new();

        if !live_local_refs.is_empty() {
            let files = inner
                .state
                .file_image_map
                .entry(doc_key.to_string())
                .or_default();
            for reference in live_local_refs {
                if !files.iter().any(|p| same_asset(doc_key, p, reference)) {
                    files.push(reference.clone());
                    adopted.push(reference.clone());
                }
            }
        }

        let tracked = inner
            .state
            .file_image_map
            .get(doc_key)
            .cloned()
            .unwrap_or_default();
        let statuses = inner
            .state
            .url_mapping
            .get(doc_key)
            .map(|urls| {
                urls.iter()
                    .map(|(url, local)| {
                        let is_tracked = tracked.iter().any(|p| same_asset(doc_key, p, local));
                        let is_live = live_local_refs
                            .iter()
                            .any(|r| same_asset(doc_key, r, local));
                        let status = if is_tracked && is_live {
                            DownloadStatus::Success
                        } else {
                            DownloadStatus::Pending
                        };
                        (url.clone(), status)
                    })
                    .collect()
            })
            .unwrap_or_default();

        if !adopted.is_empty() {
            debug!("Adopted {} untracked local images for {}", adopted.len(), doc_key);
            inner.touch();
        }

        ReconcileOutcome { adopted, statuses }
    }

    /// Drop state for documents that no longer exist and for tracked assets
    /// whose file is gone. Idempotent.
    ///
    /// All existence checks run before anything is removed, so a vault error
    /// leaves the store untouched.
    pub async fn prune_orphans(&self, vault: &dyn Vault) -> VaultResult<PruneReport> {
        let (documents, file_sets) = {
            let inner = self.inner.lock();
            let documents: BTreeSet<String> = inner
                .state
                .file_image_map
                .keys()
                .chain(inner.state.url_mapping.keys())
                .cloned()
                .collect();
            (documents, inner.state.file_image_map.clone())
        };

        let mut report = PruneReport::default();
        for doc in &documents {
            if !vault.exists(doc).await? {
                report.removed_documents.push(doc.clone());
                continue;
            }

            for path in file_sets.get(doc).into_iter().flatten() {
                if !asset_exists(vault, doc, path).await? {
                    report.removed_assets.push((doc.clone(), path.clone()));
                }
            }
        }

        let mut inner = self.inner.lock();
        for doc in &report.removed_documents {
            inner.state.file_image_map.remove(doc);
            inner.state.url_mapping.remove(doc);
        }
        for (doc, path) in &report.removed_assets {
            if let Some(files) = inner.state.file_image_map.get_mut(doc) {
                files.retain(|p| p != path);
            }
        }
        let before = inner.state.file_image_map.len();
        inner.state.file_image_map.retain(|_, files| !files.is_empty());
        let emptied = before != inner.state.file_image_map.len();

        if !report.is_empty() || emptied {
            info!(
                "Pruned {} missing documents and {} missing assets",
                report.removed_documents.len(),
                report.removed_assets.len()
            );
            inner.touch();
        }

        Ok(report)
    }
}

/// Whether any plausible location of `path` (as written in `doc_key`) exists
pub(crate) async fn asset_exists(vault: &dyn Vault, doc_key: &str, path: &str) -> VaultResult<bool> {
    for candidate in asset_candidates(doc_key, path) {
        if vault.exists(&candidate).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// [`StateStore`] writing pretty JSON to a single file.
///
/// Saves go to a sibling temp file first and are renamed into place, so a
/// crash mid-write never leaves a truncated state file behind.
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonStateFile {
    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| PersistenceError::Deserialization(e.to_string()))
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStateStore, MemoryVault};
    use tempfile::TempDir;

    fn store() -> (MappingStore, Arc<MemoryStateStore>) {
        let backend = Arc::new(MemoryStateStore::new());
        (MappingStore::new(backend.clone()), backend)
    }

    #[test]
    fn record_download_dedupes_file_set() {
        let (store, _) = store();
        store.record_download("a.md", "https://x.com/1.png", "imgs/1.png");
        store.record_download("a.md", "https://x.com/1.png", "imgs/1.png");
        store.record_download("a.md", "https://x.com/2.png", "imgs/2.png");

        assert_eq!(store.file_images("a.md"), vec!["imgs/1.png", "imgs/2.png"]);
        assert_eq!(
            store.url_mapping("a.md").get("https://x.com/2.png"),
            Some(&"imgs/2.png".to_string())
        );
        assert!(store.is_dirty());
    }

    #[test]
    fn remove_document_drops_both_maps() {
        let (store, _) = store();
        store.record_download("a.md", "https://x.com/1.png", "imgs/1.png");

        assert!(store.remove_document("a.md"));
        assert!(store.file_images("a.md").is_empty());
        assert!(store.url_mapping("a.md").is_empty());
        assert!(!store.remove_document("a.md"));
    }

    #[test]
    fn reconcile_adopts_untracked_refs_and_reports_statuses() {
        let (store, _) = store();
        store.record_download("n/a.md", "https://x.com/1.png", "imgs/1.png");
        store.record_download("n/a.md", "https://x.com/2.png", "imgs/2.png");

        let live = vec!["/imgs/1.png".to_string(), "hand/added.png".to_string()];
        let outcome = store.reconcile("n/a.md", &live);

        assert_eq!(outcome.adopted, vec!["hand/added.png"]);
        assert_eq!(
            outcome.statuses,
            vec![
                ("https://x.com/1.png".to_string(), DownloadStatus::Success),
                ("https://x.com/2.png".to_string(), DownloadStatus::Pending),
            ]
        );
        assert_eq!(
            store.file_images("n/a.md"),
            vec!["imgs/1.png", "imgs/2.png", "hand/added.png"]
        );
    }

    #[test]
    fn reconcile_without_refs_does_not_create_entries() {
        let (store, _) = store();
        let outcome = store.reconcile("empty.md", &[]);
        assert!(outcome.adopted.is_empty());
        assert!(store.documents().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn shared_assets_are_detected_across_documents() {
        let (store, _) = store();
        store.record_download("a.md", "https://x.com/1.png", "imgs/1.png");
        store.record_download("b.md", "https://x.com/1.png", "/imgs/1.png");
        store.record_download("a.md", "https://x.com/2.png", "imgs/2.png");

        assert!(store.is_shared("a.md", "imgs/1.png"));
        assert!(!store.is_shared("a.md", "imgs/2.png"));
    }

    #[test]
    fn rename_moves_and_merges() {
        let (store, _) = store();
        store.record_download("old.md", "https://x.com/1.png", "imgs/1.png");
        store.record_download("new.md", "https://x.com/2.png", "imgs/2.png");

        assert!(store.rename_document("old.md", "new.md"));
        assert_eq!(store.file_images("new.md"), vec!["imgs/2.png", "imgs/1.png"]);
        assert_eq!(store.url_mapping("new.md").len(), 2);
        assert_eq!(store.documents(), vec!["new.md"]);
    }

    #[test]
    fn forget_asset_touches_only_referencing_documents() {
        let (store, _) = store();
        store.record_download("a.md", "https://x.com/1.png", "imgs/1.png");
        store.record_download("b.md", "https://x.com/2.png", "imgs/2.png");

        assert_eq!(store.forget_asset("/imgs/1.png"), vec!["a.md"]);
        assert!(store.file_images("a.md").is_empty());
        assert_eq!(store.file_images("b.md"), vec!["imgs/2.png"]);
    }

    #[tokio::test]
    async fn prune_removes_missing_documents_and_assets() {
        let (store, _) = store();
        let vault = MemoryVault::new();
        vault.insert_document("kept.md", "![](imgs/1.png)");
        vault.insert_binary("imgs/1.png", vec![0; 10]);

        store.record_download("kept.md", "https://x.com/1.png", "imgs/1.png");
        store.record_download("kept.md", "https://x.com/2.png", "imgs/gone.png");
        store.record_download("deleted.md", "https://x.com/3.png", "imgs/3.png");

        let report = store.prune_orphans(&vault).await.unwrap();

        assert_eq!(report.removed_documents, vec!["deleted.md"]);
        assert_eq!(
            report.removed_assets,
            vec![("kept.md".to_string(), "imgs/gone.png".to_string())]
        );
        assert_eq!(store.file_images("kept.md"), vec!["imgs/1.png"]);
        assert!(store.url_mapping("deleted.md").is_empty());
    }

    #[tokio::test]
    async fn prune_is_idempotent() {
        let (store, _) = store();
        let vault = MemoryVault::new();
        vault.insert_document("a.md", "");
        store.record_download("a.md", "https://x.com/1.png", "imgs/missing.png");
        store.record_download("b.md", "https://x.com/2.png", "imgs/2.png");

        let first = store.prune_orphans(&vault).await.unwrap();
        assert!(!first.is_empty());
        store.save().await.unwrap();
        let after_first = store.snapshot();

        let second = store.prune_orphans(&vault).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.snapshot(), after_first);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn prune_finds_assets_relative_to_the_document() {
        let (store, _) = store();
        let vault = MemoryVault::new();
        vault.insert_document("notes/a.md", "");
        vault.insert_binary("notes/pics/x.png", vec![0; 10]);
        store.reconcile("notes/a.md", &["pics/x.png".to_string()]);

        let report = store.prune_orphans(&vault).await.unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_state_and_stays_dirty() {
        let (store, backend) = store();
        store.record_download("a.md", "https://x.com/1.png", "imgs/1.png");

        backend.fail_saves(true);
        assert!(store.save().await.is_err());
        assert!(store.is_dirty());
        assert_eq!(store.file_images("a.md"), vec!["imgs/1.png"]);

        backend.fail_saves(false);
        assert!(store.save_if_dirty().await.unwrap());
        assert!(!store.is_dirty());
        assert_eq!(backend.saved().unwrap().file_image_map.len(), 1);
    }

    #[tokio::test]
    async fn load_replaces_memory_and_is_clean() {
        let (store, backend) = store();
        let mut state = PersistedState::default();
        state.custom_assets_dir = "./imgs".to_string();
        state
            .file_image_map
            .insert("a.md".to_string(), vec!["imgs/1.png".to_string()]);
        backend.set_saved(state);

        store.load().await.unwrap();
        assert_eq!(store.settings().custom_assets_dir, "./imgs");
        assert_eq!(store.file_images("a.md"), vec!["imgs/1.png"]);
        assert!(!store.is_dirty());
    }

    #[test]
    fn persisted_state_uses_camel_case_keys() {
        let mut state = PersistedState::default();
        state.auto_delete_images = true;
        state
            .url_mapping
            .entry("a.md".to_string())
            .or_default()
            .insert("https://x.com/1.png".to_string(), "imgs/1.png".to_string());

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["autoDeleteImages"], true);
        assert_eq!(json["customAssetsDir"], "");
        assert_eq!(json["urlMapping"]["a.md"]["https://x.com/1.png"], "imgs/1.png");
        assert!(json["fileImageMap"].is_object());
    }

    #[test]
    fn legacy_string_file_image_map_is_accepted() {
        let json = r#"{
            "customAssetsDir": "assets",
            "fileImageMap": "{\"a.md\": [\"x.png\", \"x.png\", \"y.png\"], \"bad.md\": 3}"
        }"#;

        let state: PersistedState = serde_json::from_str(json).unwrap();
        assert_eq!(state.custom_assets_dir, "assets");
        assert!(!state.auto_delete_images);
        assert_eq!(state.file_image_map.len(), 1);
        assert_eq!(state.file_image_map["a.md"], vec!["x.png", "y.png"]);
    }

    #[tokio::test]
    async fn json_state_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        let file = JsonStateFile::new(temp.path().join(".tether").join("state.json"));

        assert!(file.load().await.unwrap().is_none());

        let mut state = PersistedState::default();
        state
            .file_image_map
            .insert("a.md".to_string(), vec!["imgs/1.png".to_string()]);
        file.save(&state).await.unwrap();

        assert_eq!(file.load().await.unwrap(), Some(state));
        assert!(!temp.path().join(".tether").join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_state_file_is_a_deserialization_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonStateFile::new(&path).load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Deserialization(_)));
    }
}
