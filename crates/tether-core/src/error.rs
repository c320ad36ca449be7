//! Error types for request-level failures.
//!
//! Failures that belong to a single URL or a single file (a bad download, a
//! file that refuses to be deleted) are not errors here; they are recorded in
//! the summaries returned by [`crate::ImageManager`]. Only structural problems
//! that stop a whole request end up as a [`TetherError`].

use thiserror::Error;

/// Errors raised by a [`crate::Vault`] implementation
#[derive(Error, Debug, Clone)]
pub enum VaultError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Path escapes the vault: {0}")]
    OutsideVault(String),
}

impl VaultError {
    pub fn io(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors raised while loading or saving the mapping state
#[derive(Error, Debug, Clone)]
pub enum PersistenceError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Request-level failures of the image manager
#[derive(Error, Debug, Clone)]
pub enum TetherError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("No remote images found in {0}")]
    NoImages(String),

    #[error("No local images are tracked for {0}")]
    NoLocalImages(String),

    #[error("No remote mapping is recorded for {0}")]
    NoMapping(String),

    #[error("Referer prompt was cancelled")]
    Cancelled,

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for image manager operations
pub type TetherResult<T> = Result<T, TetherError>;

impl TetherError {
    /// Whether the request was refused before touching any state
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DocumentNotFound(_)
                | Self::NoImages(_)
                | Self::NoLocalImages(_)
                | Self::NoMapping(_)
                | Self::Cancelled
        )
    }
}
