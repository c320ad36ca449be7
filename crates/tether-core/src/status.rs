//! Transient per-URL download status.
//!
//! Statuses are advisory: they are rebuilt every session from the persisted
//! mappings and never saved. Losing them cannot corrupt durable state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status per remote URL, process-wide
#[derive(Debug, Default, Clone)]
pub struct StatusBoard {
    statuses: HashMap<String, DownloadStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of `url`, `Pending` when unknown
    pub fn get(&self, url: &str) -> DownloadStatus {
        self.statuses.get(url).copied().unwrap_or_default()
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.statuses.contains_key(url)
    }

    pub fn set(&mut self, url: impl Into<String>, status: DownloadStatus) {
        self.statuses.insert(url.into(), status);
    }

    /// Mark `url` pending unless it already has a status
    pub fn ensure(&mut self, url: &str) {
        if !self.statuses.contains_key(url) {
            self.statuses.insert(url.to_string(), DownloadStatus::Pending);
        }
    }

    /// The subset of `urls` currently marked failed, order preserved
    pub fn failed_among<'a>(&self, urls: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        urls.into_iter()
            .filter(|url| self.get(url) == DownloadStatus::Failed)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
