use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Browser-like identity sent with every image request. Some image hosts
/// refuse obvious non-browser clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0";

/// Responses smaller than this (SVG excepted) are treated as error pages.
pub const DEFAULT_MIN_IMAGE_BYTES: u64 = 1024;

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error during file operations
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that could not be read or written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Configuration parsed but is not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TetherConfig {
    /// Vault location and layout
    pub vault: VaultConfig,
    /// Image download behaviour
    pub download: DownloadConfig,
    /// Logging defaults
    pub logging: LoggingConfig,
}

/// Vault configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VaultConfig {
    /// Root directory holding notes and attachments
    pub path: PathBuf,

    /// Default attachment location used when no custom asset directory is set.
    /// Empty or `/` means the vault root, a leading `.` is relative to the note.
    pub attachment_dir: String,

    /// Where the mapping state is persisted (defaults to `<vault>/.tether/state.json`)
    pub state_file: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            attachment_dir: String::new(),
            state_file: None,
        }
    }
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DownloadConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Non-SVG bodies below this size are rejected as "too small"
    pub min_image_bytes: u64,

    /// Report a likely-wrong referer when an origin answers with `text/*`
    pub text_content_hint: bool,

    /// Optional request timeout in seconds. Unset means the transport default
    /// (no overall timeout).
    pub timeout_secs: Option<u64>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_image_bytes: DEFAULT_MIN_IMAGE_BYTES,
            text_content_hint: true,
            timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level name (off, error, warn, info, debug, trace)
    pub level: Option<String>,
}

impl TetherConfig {
    /// Load configuration from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file_path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !file_path.exists() {
            debug!("No config at {}, using defaults", file_path.display());
            return Ok(Self::default());
        }

        Self::load_from_file(&file_path)
    }

    /// Load and validate configuration from an existing TOML file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TetherConfig = toml::from_str(&content)?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render the configuration as it would be saved
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Default config file location: `<config_dir>/tether/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tether").join("config.toml"))
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.download.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "download.user_agent must not be empty".to_string(),
            ));
        }

        if let Some(state_file) = &self.vault.state_file {
            if state_file == &self.vault.path {
                return Err(ConfigError::Invalid(
                    "vault.state_file must be a file, not the vault directory".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Resolved location of the persisted mapping state
    pub fn state_file_path(&self) -> PathBuf {
        match &self.vault.state_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.vault.path.join(path),
            None => self.vault.path.join(".tether").join("state.json"),
        }
    }

    /// Replace the vault root, keeping everything else
    pub fn with_vault_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vault.path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_download_heuristics() {
        let config = TetherConfig::default();
        assert_eq!(config.download.min_image_bytes, 1024);
        assert!(config.download.text_content_hint);
        assert!(config.download.timeout_secs.is_none());
        assert!(config.download.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.vault.attachment_dir, "");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let toml_str = r#"
[vault]
path = "/notes"
attachment_dir = "assets"

[download]
min_image_bytes = 64
"#;

        let config: TetherConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.vault.path, PathBuf::from("/notes"));
        assert_eq!(config.vault.attachment_dir, "assets");
        assert_eq!(config.download.min_image_bytes, 64);
        assert_eq!(config.download.user_agent, DEFAULT_USER_AGENT);
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn state_file_defaults_inside_vault() {
        let config = TetherConfig::default().with_vault_path("/notes");
        assert_eq!(
            config.state_file_path(),
            PathBuf::from("/notes/.tether/state.json")
        );
    }

    #[test]
    fn relative_state_file_is_vault_relative() {
        let mut config = TetherConfig::default().with_vault_path("/notes");
        config.vault.state_file = Some(PathBuf::from("meta/tether.json"));
        assert_eq!(
            config.state_file_path(),
            PathBuf::from("/notes/meta/tether.json")
        );
    }

    #[test]
    fn empty_user_agent_is_rejected() {
        let mut config = TetherConfig::default();
        config.download.user_agent = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn state_file_equal_to_vault_is_rejected() {
        let mut config = TetherConfig::default().with_vault_path("/notes");
        config.vault.state_file = Some(PathBuf::from("/notes"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = TetherConfig::load(Some(&temp.path().join("absent.toml"))).unwrap();
        assert_eq!(config.download, DownloadConfig::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = TetherConfig::default().with_vault_path(temp.path());
        config.download.timeout_secs = Some(30);
        config.logging.level = Some("debug".to_string());
        config.save(&path).unwrap();

        let loaded = TetherConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[download\nmin_image_bytes = ").unwrap();

        assert!(matches!(
            TetherConfig::load(Some(&path)),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
