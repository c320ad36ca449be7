//! # Tether Configuration
//!
//! TOML configuration for the Tether workspace: where the vault lives, where
//! the mapping state is stored, how downloads identify themselves and which
//! heuristics reject non-image responses.
//!
//! ```rust,no_run
//! use tether_config::TetherConfig;
//!
//! # fn example() -> Result<(), tether_config::ConfigError> {
//! let config = TetherConfig::load(None)?;
//! println!("state file: {}", config.state_file_path().display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;

pub use config::*;
