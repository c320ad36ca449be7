use anyhow::{Context, Result};
use colored::Colorize;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::path::Path;
use std::time::Duration;
use tether_core::manager::is_document_key;
use tether_core::FsVault;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// A vault change the image manager cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultChange {
    /// A note or asset disappeared
    Removed(String),
    /// A note moved
    Renamed { from: String, to: String },
    /// A note was created or edited
    Changed(String),
}

/// Execute watch command
pub async fn execute(ctx: &AppContext) -> Result<()> {
    ctx.manager.startup(&[]).await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| match result {
        Ok(events) => {
            for event in events {
                if tx.send(event.event).is_err() {
                    debug!("Watch loop gone, dropping event");
                }
            }
        }
        Err(errors) => {
            for e in errors {
                error!("Notify error: {:?}", e);
            }
        }
    })
    .context("Failed to create vault watcher")?;

    debouncer
        .watch(ctx.vault.root(), RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", ctx.vault.root().display()))?;

    info!("Watching {}", ctx.vault.root().display());
    eprintln!(
        "{} {} (Ctrl+C to stop)",
        "Watching".cyan().bold(),
        ctx.vault.root().display()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watcher");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                for change in classify(&ctx.vault, &event) {
                    if let Err(e) = apply(ctx, &change).await {
                        warn!("Failed to handle {:?}: {}", change, e);
                    }
                }
            }
        }
    }

    ctx.manager.store().save_if_dirty().await?;
    Ok(())
}

/// Map a filesystem event to vault changes.
///
/// Paths outside the vault and hidden paths (any segment starting with `.`)
/// are ignored.
pub fn classify(vault: &FsVault, event: &Event) -> Vec<VaultChange> {
    let keys: Vec<Option<String>> = event.paths.iter().map(|p| visible_key(vault, p)).collect();

    match event.kind {
        EventKind::Remove(_) => keys.into_iter().flatten().map(VaultChange::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match keys.as_slice() {
            [Some(from), Some(to)] if is_document_key(from) && is_document_key(to) => {
                vec![VaultChange::Renamed {
                    from: from.clone(),
                    to: to.clone(),
                }]
            }
            [Some(from), to] => {
                let mut changes = vec![VaultChange::Removed(from.clone())];
                if let Some(to) = to.as_ref().filter(|k| is_document_key(k)) {
                    changes.push(VaultChange::Changed(to.clone()));
                }
                changes
            }
            [None, Some(to)] if is_document_key(to) => vec![VaultChange::Changed(to.clone())],
            _ => Vec::new(),
        },
        // Platforms that report each side of a rename separately
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .zip(keys)
            .filter_map(|(path, key)| {
                let key = key?;
                if !path.exists() {
                    Some(VaultChange::Removed(key))
                } else if is_document_key(&key) {
                    Some(VaultChange::Changed(key))
                } else {
                    None
                }
            })
            .collect(),
        EventKind::Create(_) | EventKind::Modify(_) => keys
            .into_iter()
            .flatten()
            .filter(|k| is_document_key(k))
            .map(VaultChange::Changed)
            .collect(),
        _ => Vec::new(),
    }
}

fn visible_key(vault: &FsVault, path: &Path) -> Option<String> {
    let key = vault.key_for(path)?;
    if key.is_empty() || key.split('/').any(|segment| segment.starts_with('.')) {
        return None;
    }
    Some(key)
}

async fn apply(ctx: &AppContext, change: &VaultChange) -> Result<()> {
    match change {
        VaultChange::Removed(key) => {
            debug!("Removed: {}", key);
            ctx.manager.on_file_deleted(key).await?;
        }
        VaultChange::Renamed { from, to } => {
            debug!("Renamed: {} -> {}", from, to);
            ctx.manager.on_document_renamed(from, to).await?;
        }
        VaultChange::Changed(key) => {
            let text = match ctx.manager.vault().read_document(key).await {
                Ok(text) => text,
                Err(e) => {
                    debug!("Skipping {}: {}", key, e);
                    return Ok(());
                }
            };
            ctx.manager.on_document_opened(key, &text).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::path::PathBuf;

    fn vault() -> FsVault {
        FsVault::new("/vault", "")
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_removed_files_become_removals() {
        let changes = classify(
            &vault(),
            &event(EventKind::Remove(RemoveKind::File), &["/vault/notes/a.md", "/vault/imgs/a.png"]),
        );
        assert_eq!(
            changes,
            vec![
                VaultChange::Removed("notes/a.md".to_string()),
                VaultChange::Removed("imgs/a.png".to_string()),
            ]
        );
    }

    #[test]
    fn test_note_rename_is_a_rename() {
        let changes = classify(
            &vault(),
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/a.md", "/vault/sub/b.md"],
            ),
        );
        assert_eq!(
            changes,
            vec![VaultChange::Renamed {
                from: "a.md".to_string(),
                to: "sub/b.md".to_string(),
            }]
        );
    }

    #[test]
    fn test_asset_rename_forgets_the_old_path() {
        let changes = classify(
            &vault(),
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/imgs/a.png", "/vault/imgs/b.png"],
            ),
        );
        assert_eq!(changes, vec![VaultChange::Removed("imgs/a.png".to_string())]);
    }

    #[test]
    fn test_edits_only_track_notes() {
        let changes = classify(
            &vault(),
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/vault/a.md", "/vault/imgs/a.png"],
            ),
        );
        assert_eq!(changes, vec![VaultChange::Changed("a.md".to_string())]);

        let changes = classify(&vault(), &event(EventKind::Create(CreateKind::File), &["/vault/new.md"]));
        assert_eq!(changes, vec![VaultChange::Changed("new.md".to_string())]);
    }

    #[test]
    fn test_hidden_and_outside_paths_are_ignored() {
        let changes = classify(
            &vault(),
            &event(
                EventKind::Remove(RemoveKind::File),
                &["/vault/.tether/state.json", "/elsewhere/a.md", "/vault/.obsidian/app.json"],
            ),
        );
        assert!(changes.is_empty());
    }
}
