//! Vault path helpers and asset path allocation.
//!
//! Vault keys are `/` separated and relative to the vault root. A key never
//! starts with `/` and never contains `.` or `..` segments once normalized.

use crate::error::VaultResult;
use crate::traits::Vault;
use chrono::Utc;
use rand::Rng;
use tracing::{debug, warn};

/// Characters used for the random part of generated file names
pub const NAME_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";

/// Length of the random part of generated file names
pub const NAME_RANDOM_LEN: usize = 5;

/// Normalize a path into a vault key: `\` becomes `/`, leading separators,
/// empty and `.` segments are dropped and `..` pops (never above the root).
pub fn normalize_key(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Directory part of a key, `""` for top-level entries
pub fn parent_dir(key: &str) -> &str {
    key.rfind('/').map(|idx| &key[..idx]).unwrap_or("")
}

/// Join `rel` onto `base` and normalize
pub fn join_key(base: &str, rel: &str) -> String {
    if base.is_empty() {
        normalize_key(rel)
    } else {
        normalize_key(&format!("{}/{}", base, rel))
    }
}

/// Resolve an embed target the way a reader of `doc_key` would: a leading `/`
/// is vault-absolute, anything else relative to the document's directory.
pub fn resolve_in_document(doc_key: &str, target: &str) -> String {
    if target.starts_with('/') || target.starts_with('\\') {
        normalize_key(target)
    } else {
        join_key(parent_dir(doc_key), target)
    }
}

/// Keys a local target may refer to, most likely first
pub fn asset_candidates(doc_key: &str, target: &str) -> Vec<String> {
    let direct = normalize_key(target);
    let relative = resolve_in_document(doc_key, target);
    if relative == direct {
        vec![direct]
    } else {
        vec![direct, relative]
    }
}

/// Whether two targets written in `doc_key` name the same asset
pub fn same_asset(doc_key: &str, a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (na, nb) = (normalize_key(a), normalize_key(b));
    na == nb || resolve_in_document(doc_key, a) == nb || resolve_in_document(doc_key, b) == na
}

/// Directory a custom asset setting points at for `doc_key`.
///
/// A leading `.` makes the setting relative to the document's directory.
pub fn resolve_custom_dir(custom_dir: &str, doc_key: &str) -> String {
    let custom_dir = custom_dir.trim();
    if custom_dir.starts_with('.') {
        join_key(parent_dir(doc_key), custom_dir)
    } else {
        normalize_key(custom_dir)
    }
}

/// `{timestamp}_{random}{extension}`
pub fn generate_file_name<R: Rng>(rng: &mut R, timestamp: i64, extension: &str) -> String {
    let random: String = (0..NAME_RANDOM_LEN)
        .map(|_| NAME_ALPHABET[rng.random_range(0..NAME_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}{}", timestamp, random, extension)
}

/// First free key for `file_name` inside `dir`, appending `_1`, `_2`, ... to
/// the base name on collision.
pub async fn unique_path(vault: &dyn Vault, dir: &str, file_name: &str) -> VaultResult<String> {
    let (base, extension) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    };

    let mut candidate = join_key(dir, file_name);
    let mut counter = 1;
    while vault.exists(&candidate).await? {
        candidate = join_key(dir, &format!("{}_{}{}", base, counter, extension));
        counter += 1;
    }
    Ok(candidate)
}

/// Where a downloaded asset will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub path: String,
    /// Whether the custom asset directory was used
    pub custom: bool,
}

/// Chooses destination paths for downloaded assets
pub struct PathAllocator<'a> {
    vault: &'a dyn Vault,
    custom_dir: Option<&'a str>,
}

impl<'a> PathAllocator<'a> {
    pub fn new(vault: &'a dyn Vault, custom_dir: &'a str) -> Self {
        let custom_dir = Some(custom_dir.trim()).filter(|d| !d.is_empty());
        Self { vault, custom_dir }
    }

    /// Allocate a fresh path for an asset of `doc_key` with `extension`.
    ///
    /// The custom directory is created when missing. If that fails the vault's
    /// default attachment location is used instead.
    pub async fn allocate(&self, doc_key: &str, extension: &str) -> VaultResult<Allocation> {
        let file_name = generate_file_name(&mut rand::rng(), Utc::now().timestamp(), extension);
        self.allocate_named(doc_key, &file_name).await
    }

    /// Allocate using a caller-chosen file name
    pub async fn allocate_named(&self, doc_key: &str, file_name: &str) -> VaultResult<Allocation> {
        if let Some(custom) = self.custom_dir {
            let dir = resolve_custom_dir(custom, doc_key);
            match self.allocate_in(&dir, file_name).await {
                Ok(path) => {
                    debug!("Allocated {} in custom directory", path);
                    return Ok(Allocation { path, custom: true });
                }
                Err(e) => {
                    warn!(
                        "Custom asset directory {:?} unusable ({}), using default attachment location",
                        dir, e
                    );
                }
            }
        }

        let path = self
            .vault
            .available_attachment_path(doc_key, file_name)
            .await?;
        debug!("Allocated {} in default attachment location", path);
        Ok(Allocation {
            path,
            custom: false,
        })
    }

    async fn allocate_in(&self, dir: &str, file_name: &str) -> VaultResult<String> {
        if !dir.is_empty() && !self.vault.exists(dir).await? {
            self.vault.create_dir_all(dir).await?;
        }
        unique_path(self.vault, dir, file_name).await
    }
}
