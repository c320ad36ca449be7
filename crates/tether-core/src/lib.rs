//! # Tether Core
//!
//! Remote-image lifecycle management for Markdown vaults.
//!
//! Notes embed images as `![alt](target)`. When the target is a remote URL,
//! [`ImageManager`] can download it into the vault, rewrite the note to the
//! local copy and remember the association so the change can be reverted or
//! cleaned up later. All durable bookkeeping lives in the [`MappingStore`];
//! everything that touches the outside world is injected through the traits in
//! [`traits`].
//!
//! Leaf modules are pure and usable on their own:
//!
//! - [`embed`] finds image embeds in text
//! - [`referer`] derives a Referer header from frontmatter or leading text
//! - [`rewrite`] swaps embed targets in both directions
//! - [`paths`] allocates collision-free asset paths

pub mod download;
pub mod embed;
mod error;
pub mod manager;
pub mod mapping;
pub mod paths;
pub mod referer;
pub mod rewrite;
pub mod status;
pub mod traits;
pub mod vault;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use download::{FailureKind, FetchError, FetchedImage, HttpImageFetcher};
pub use embed::{image_embeds, local_targets, remote_urls, ImageEmbed, ImageRef, RefKind};
pub use error::{PersistenceError, TetherError, TetherResult, VaultError, VaultResult};
pub use manager::{
    DeleteSummary, DownloadOutcome, DownloadSummary, ImageEntry, ImageManager, RequestPhase,
    RevertSummary,
};
pub use mapping::{JsonStateFile, MappingStore, PersistedState, PruneReport, Settings};
pub use paths::{Allocation, PathAllocator};
pub use referer::{resolve_referer, RefererMode, RefererSource, ResolvedReferer};
pub use rewrite::{apply_downloads, revert};
pub use status::{DownloadStatus, StatusBoard};
pub use traits::{ImageFetcher, Notice, Notifier, RefererPrompt, StateStore, Vault};
pub use vault::FsVault;
