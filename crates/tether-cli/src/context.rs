//! Wiring of the core collaborators for one CLI invocation.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tether_config::TetherConfig;
use tether_core::paths::normalize_key;
use tether_core::{FsVault, HttpImageFetcher, ImageManager, JsonStateFile};
use tracing::debug;

use crate::notifier::TerminalNotifier;
use crate::prompt::DialoguerPrompt;

/// Everything a command needs
pub struct AppContext {
    pub config: TetherConfig,
    pub config_path: Option<PathBuf>,
    pub vault: Arc<FsVault>,
    pub state_file: PathBuf,
    pub manager: ImageManager,
}

impl AppContext {
    /// Build the context and load persisted state.
    ///
    /// Orphans are not pruned here; `watch` and `prune` do that.
    pub async fn open(config: TetherConfig, config_path: Option<PathBuf>) -> Result<Self> {
        config.validate()?;

        let root = &config.vault.path;
        if !root.is_dir() {
            bail!(
                "Vault directory {} does not exist (set it with --vault, TETHER_VAULT or [vault] path)",
                root.display()
            );
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve vault path {}", root.display()))?;
        let config = config.with_vault_path(root.clone());

        let state_file = config.state_file_path();
        debug!("Vault: {}, state file: {}", root.display(), state_file.display());

        let vault = Arc::new(FsVault::from_config(&config.vault));
        let fetcher = HttpImageFetcher::new(&config.download).context("Failed to build HTTP client")?;
        let manager = ImageManager::new(
            vault.clone(),
            Arc::new(fetcher),
            Arc::new(DialoguerPrompt::new()),
            Arc::new(TerminalNotifier::new()),
            Arc::new(JsonStateFile::new(state_file.clone())),
        );

        manager
            .load_state()
            .await
            .with_context(|| format!("Failed to load state from {}", state_file.display()))?;

        Ok(Self {
            config,
            config_path,
            vault,
            state_file,
            manager,
        })
    }

    /// Turn a note argument into a vault key.
    ///
    /// Absolute paths and paths that exist relative to the working directory
    /// must lie inside the vault; anything else is taken as a vault key.
    pub fn doc_key(&self, doc: &str) -> Result<String> {
        let path = Path::new(doc);
        let on_disk = if path.is_absolute() {
            Some(path.to_path_buf())
        } else if path.exists() {
            std::env::current_dir().ok().map(|cwd| cwd.join(path))
        } else {
            None
        };

        if let Some(path) = on_disk {
            let resolved = path.canonicalize().unwrap_or(path);
            return self
                .vault
                .key_for(&resolved)
                .with_context(|| format!("{} is not inside the vault {}", doc, self.vault.root().display()));
        }

        let key = normalize_key(doc);
        if key.is_empty() {
            bail!("Note path is empty");
        }
        Ok(key)
    }
}
