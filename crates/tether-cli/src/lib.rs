//! Command line front-end for tether.
//!
//! Wires the core [`tether_core::ImageManager`] to the local filesystem, an
//! HTTP fetcher and the terminal.

pub mod cli;
pub mod commands;
pub mod context;
pub mod notifier;
pub mod output;
pub mod prompt;
