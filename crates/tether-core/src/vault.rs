//! Filesystem-backed [`Vault`].

use crate::error::{VaultError, VaultResult};
use crate::paths::{join_key, normalize_key, parent_dir, unique_path};
use crate::traits::Vault;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tether_config::VaultConfig;
use tracing::debug;

/// A vault rooted at a directory on disk.
///
/// `attachment_dir` is where new attachments go by default: empty or `/` is
/// the vault root, a leading `.` is relative to the document, anything else is
/// relative to the vault root.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    attachment_dir: String,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>, attachment_dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            attachment_dir: attachment_dir.into(),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.path.clone(), config.attachment_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a key. Keys that climb above the root are rejected.
    pub fn resolve(&self, key: &str) -> VaultResult<PathBuf> {
        if escapes_root(key) {
            return Err(VaultError::OutsideVault(key.to_string()));
        }
        let key = normalize_key(key);
        Ok(key
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    /// Key for an absolute path inside the vault
    pub fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(segments.join("/"))
    }

    fn attachment_dir_for(&self, doc_key: &str) -> String {
        let dir = self.attachment_dir.trim();
        if dir.starts_with('.') {
            join_key(parent_dir(&normalize_key(doc_key)), dir)
        } else {
            normalize_key(dir)
        }
    }
}

/// Whether `key` has more `..` segments than directories to pop
fn escapes_root(key: &str) -> bool {
    let mut depth: i32 = 0;
    for segment in key.replace('\\', "/").split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => depth += 1,
        }
    }
    false
}

fn map_io(key: &str, err: std::io::Error) -> VaultError {
    if err.kind() == ErrorKind::NotFound {
        VaultError::NotFound(key.to_string())
    } else {
        VaultError::io(key, err)
    }
}

#[async_trait]
impl Vault for FsVault {
    async fn read_document(&self, key: &str) -> VaultResult<String> {
        let path = self.resolve(key)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| map_io(key, e))
    }

    async fn write_document(&self, key: &str, text: &str) -> VaultResult<()> {
        let path = self.resolve(key)?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| map_io(key, e))
    }

    async fn exists(&self, path: &str) -> VaultResult<bool> {
        let resolved = self.resolve(path)?;
        tokio::fs::try_exists(&resolved)
            .await
            .map_err(|e| VaultError::io(path, e))
    }

    async fn create_dir_all(&self, path: &str) -> VaultResult<()> {
        let resolved = self.resolve(path)?;
        tokio::fs::create_dir_all(&resolved)
            .await
            .map_err(|e| VaultError::io(path, e))
    }

    async fn write_binary(&self, path: &str, bytes: &[u8]) -> VaultResult<()> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VaultError::io(path, e))?;
        }
        tokio::fs::write(&resolved, bytes)
            .await
            .map_err(|e| VaultError::io(path, e))?;
        debug!("Wrote {} bytes to {}", bytes.len(), resolved.display());
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> VaultResult<()> {
        let resolved = self.resolve(path)?;
        tokio::fs::remove_file(&resolved)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn available_attachment_path(&self, doc_key: &str, file_name: &str) -> VaultResult<String> {
        let dir = self.attachment_dir_for(doc_key);
        if !dir.is_empty() {
            self.create_dir_all(&dir).await?;
        }
        unique_path(self, &dir, file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault(attachment_dir: &str) -> (TempDir, FsVault) {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path(), attachment_dir);
        (temp, vault)
    }

    #[tokio::test]
    async fn documents_round_trip() {
        let (temp, vault) = vault("");
        std::fs::create_dir_all(temp.path().join("notes")).unwrap();

        vault.write_document("notes/a.md", "# Hello").await.unwrap();
        assert_eq!(vault.read_document("/notes/a.md").await.unwrap(), "# Hello");
        assert!(vault.exists("notes").await.unwrap());
        assert!(vault.exists("notes/a.md").await.unwrap());
        assert!(!vault.exists("notes/b.md").await.unwrap());
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let (_temp, vault) = vault("");
        let err = vault.read_document("nope.md").await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(key) if key == "nope.md"));
    }

    #[tokio::test]
    async fn binary_writes_create_parents() {
        let (temp, vault) = vault("");
        vault.write_binary("a/b/c.png", &[1, 2, 3]).await.unwrap();
        assert_eq!(std::fs::read(temp.path().join("a/b/c.png")).unwrap(), vec![1, 2, 3]);

        vault.remove_file("a/b/c.png").await.unwrap();
        assert!(!temp.path().join("a/b/c.png").exists());
        assert!(matches!(
            vault.remove_file("a/b/c.png").await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let (_temp, vault) = vault("");
        assert!(matches!(
            vault.read_document("../outside.md").await,
            Err(VaultError::OutsideVault(_))
        ));
        assert!(vault.resolve("notes/../a.md").is_ok());
    }

    #[tokio::test]
    async fn attachment_path_follows_configured_dir() {
        let (temp, vault) = vault("attachments");
        let path = vault
            .available_attachment_path("notes/a.md", "x.png")
            .await
            .unwrap();
        assert_eq!(path, "attachments/x.png");
        assert!(temp.path().join("attachments").is_dir());

        std::fs::write(temp.path().join("attachments/x.png"), b"taken").unwrap();
        let path = vault
            .available_attachment_path("notes/a.md", "x.png")
            .await
            .unwrap();
        assert_eq!(path, "attachments/x_1.png");
    }

    #[tokio::test]
    async fn document_relative_attachment_dir() {
        let (_temp, vault) = vault("./assets");
        let path = vault
            .available_attachment_path("notes/deep/a.md", "x.png")
            .await
            .unwrap();
        assert_eq!(path, "notes/deep/assets/x.png");
    }

    #[tokio::test]
    async fn root_attachment_dir() {
        let (_temp, vault) = vault("/");
        let path = vault.available_attachment_path("notes/a.md", "x.png").await.unwrap();
        assert_eq!(path, "x.png");
    }

    #[test]
    fn key_for_strips_root() {
        let (temp, vault) = vault("");
        let key = vault.key_for(&temp.path().join("notes").join("a.md"));
        assert_eq!(key.as_deref(), Some("notes/a.md"));
        assert_eq!(vault.key_for(Path::new("/somewhere/else.md")), None);
    }
}
