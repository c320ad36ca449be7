use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// On/off switch for boolean settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle == Toggle::On
    }
}

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "tether - keep Markdown notes and their remote images tied together")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/tether/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault root directory (overrides config file)
    #[arg(long, global = true, env = "TETHER_VAULT")]
    pub vault: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the remote images of a note and their status
    List {
        /// Note path, relative to the vault root
        doc: String,
    },

    /// Download remote images into the vault and point the note at them
    Download {
        /// Note path, relative to the vault root
        doc: String,

        /// Only download these URLs (can be repeated)
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        #[command(flatten)]
        referer: RefererArgs,
    },

    /// Download images of a note and retry the ones that fail once
    Retry {
        /// Note path, relative to the vault root
        doc: String,

        #[command(flatten)]
        referer: RefererArgs,
    },

    /// Point downloaded images of a note back at their remote URLs
    Revert {
        /// Note path, relative to the vault root
        doc: String,
    },

    /// Revert a note to remote URLs and delete its local image files
    #[command(name = "delete-local")]
    DeleteLocal {
        /// Note path, relative to the vault root
        doc: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Forget a note that was deleted outside of tether
    Forget {
        /// Note path, relative to the vault root
        doc: String,
    },

    /// Drop mappings of notes and images that no longer exist
    Prune,

    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Watch the vault and keep mappings in sync with file changes
    Watch,
}

/// How the Referer header is chosen
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RefererArgs {
    /// Never prompt; send no Referer when the note does not name one
    #[arg(short, long)]
    pub quick: bool,

    /// Referer to send, overriding the note (empty sends none)
    #[arg(long, conflicts_with = "quick")]
    pub referer: Option<String>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration and stored settings
    Show,

    /// Set the directory downloads are saved to ("./dir" is relative to the note, "" resets)
    #[command(name = "assets-dir")]
    AssetsDir {
        dir: String,
    },

    /// Delete a note's images when the note is deleted
    #[command(name = "auto-delete")]
    AutoDelete {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn download_accepts_repeated_urls() {
        let cli = Cli::parse_from([
            "tether",
            "download",
            "notes/a.md",
            "--url",
            "https://x.com/1.png",
            "--url",
            "https://x.com/2.png",
            "--quick",
        ]);
        match cli.command {
            Commands::Download { doc, urls, referer } => {
                assert_eq!(doc, "notes/a.md");
                assert_eq!(urls.len(), 2);
                assert!(referer.quick);
                assert!(referer.referer.is_none());
            }
            _ => panic!("expected download"),
        }
    }

    #[test]
    fn quick_conflicts_with_referer() {
        let result = Cli::try_parse_from([
            "tether",
            "download",
            "a.md",
            "--quick",
            "--referer",
            "https://x.com",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tether", "list", "a.md", "--format", "json", "-v"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
    }
}
